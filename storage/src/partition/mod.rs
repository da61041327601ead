mod descriptor;
mod router;

pub use descriptor::PartitionDescriptor;
pub use router::{
    MaintenanceAction, PartitionKey, PartitionRouter, PartitionStrategy, RouteTarget, TableConfig,
};
