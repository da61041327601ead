pub mod reliable_sender;
