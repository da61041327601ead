/// Property tests for the quantization and delta codecs.
use proptest::prelude::*;

use realm_shared::{
    apply_delta, create_delta, pack_float, unpack_float, ByteReader, DeltaPacket, EntitySnapshot,
    FieldValue,
};

proptest! {
    #[test]
    fn bitpack_round_trip_stays_within_tolerance(
        value in -10_000.0f32..10_000.0,
        bits in 4u8..=24,
    ) {
        let (min, max) = (-10_000.0f32, 10_000.0f32);
        let packed = pack_float(value, min, max, bits).unwrap();
        let unpacked = unpack_float(packed, min, max, bits).unwrap();

        let tolerance = (max - min) / 2f32.powi(bits as i32);
        prop_assert!((unpacked - value).abs() <= tolerance);
    }

    #[test]
    fn clamped_values_stay_in_range(
        value in -1_000_000.0f32..1_000_000.0,
        bits in 1u8..=32,
    ) {
        let (min, max) = (-100.0f32, 100.0f32);
        let packed = pack_float(value, min, max, bits).unwrap();
        let unpacked = unpack_float(packed, min, max, bits).unwrap();
        prop_assert!(unpacked >= min && unpacked <= max);
    }

    #[test]
    fn delta_apply_reconstructs_the_target(
        old_hp in 0u64..1000,
        new_hp in 0u64..1000,
        old_x in -500.0f32..500.0,
        move_x in -100.0f32..100.0,
        rename in proptest::bool::ANY,
    ) {
        let old = EntitySnapshot::new(10)
            .with_field("hp", FieldValue::UInt(old_hp))
            .with_field("position", FieldValue::Vec3([old_x, 0.0, 0.0]))
            .with_field("name", FieldValue::Str("before".into()));

        let mut new = old.clone();
        new.tick = 11;
        new.set("hp", FieldValue::UInt(new_hp));
        new.set("position", FieldValue::Vec3([old_x + move_x, 0.0, 0.0]));
        if rename {
            new.set("name", FieldValue::Str("after".into()));
        }

        let delta = create_delta(&old, &new);
        let rebuilt = apply_delta(&old, &delta).unwrap();

        prop_assert_eq!(rebuilt.tick, 11);
        prop_assert_eq!(rebuilt.get("hp"), new.get("hp"));
        prop_assert_eq!(rebuilt.get("name"), new.get("name"));
        match (rebuilt.get("position"), new.get("position")) {
            (Some(FieldValue::Vec3(a)), Some(FieldValue::Vec3(b))) => {
                // quantized hundredths
                prop_assert!((a[0] - b[0]).abs() <= 0.006);
            }
            _ => prop_assert!(false, "position missing"),
        }
    }

    #[test]
    fn identical_snapshots_always_produce_empty_deltas(
        hp in 0u64..1000,
        x in -500.0f32..500.0,
    ) {
        let snapshot = EntitySnapshot::new(3)
            .with_field("hp", FieldValue::UInt(hp))
            .with_field("position", FieldValue::Vec3([x, x, x]));

        prop_assert!(create_delta(&snapshot, &snapshot).is_empty());
    }

    #[test]
    fn delta_wire_form_round_trips(
        old_hp in 0u64..1000,
        new_hp in 0u64..1000,
    ) {
        let old = EntitySnapshot::new(1).with_field("hp", FieldValue::UInt(old_hp));
        let mut new = old.clone();
        new.tick = 2;
        new.set("hp", FieldValue::UInt(new_hp));

        let delta = create_delta(&old, &new);
        let bytes = delta.to_bytes();
        let mut reader = ByteReader::new(&bytes);
        prop_assert_eq!(DeltaPacket::de(&mut reader).unwrap(), delta);
    }
}
