//! Property-Based Tests for the PFCP simulator
//!
//! Rule builder invariants, identifier monotonicity and application filter
//! parsing over generated inputs.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use std::net::Ipv4Addr;

    use crate::error::{PfcpSimError, RuleError};
    use crate::id_alloc::IdAllocator;
    use crate::rules::{FarBuilder, PdrBuilder};
    use crate::sim::{AppFilter, UeAddressPool};

    fn nonzero_ipv4() -> impl Strategy<Value = Ipv4Addr> {
        (1u32..=u32::MAX).prop_map(Ipv4Addr::from)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_uplink_pdr_needs_teid_and_n3(
            id in any::<u16>(),
            teid in any::<u32>(),
            n3 in prop::option::of(nonzero_ipv4()),
        ) {
            let mut builder = PdrBuilder::new()
                .with_id(id)
                .mark_as_uplink()
                .with_teid(teid)
                .with_far_id(1)
                .add_qer_id(1);
            if let Some(addr) = n3 {
                builder = builder.with_n3_address(addr);
            }
            let result = builder.build();
            if teid == 0 {
                prop_assert_eq!(result.unwrap_err(), RuleError::MissingTeid { pdr_id: id });
            } else if n3.is_none() {
                prop_assert_eq!(result.unwrap_err(), RuleError::MissingN3Address { pdr_id: id });
            } else {
                prop_assert!(result.is_ok());
            }
        }

        #[test]
        fn prop_downlink_pdr_needs_ue_address(
            id in any::<u16>(),
            ue in prop::option::of(nonzero_ipv4()),
        ) {
            let mut builder = PdrBuilder::new().with_id(id).mark_as_downlink().with_far_id(2).add_qer_id(1);
            if let Some(addr) = ue {
                builder = builder.with_ue_address(addr);
            }
            prop_assert_eq!(builder.build().is_ok(), ue.is_some());
        }

        #[test]
        fn prop_far_forward_and_drop_exclusive(
            id in any::<u32>(),
            forward in any::<bool>(),
            drop in any::<bool>(),
            buffer in any::<bool>(),
        ) {
            let result = FarBuilder::new()
                .with_id(id)
                .with_forward(forward)
                .with_drop(drop)
                .with_buffer(buffer)
                .build();
            if forward && drop {
                prop_assert_eq!(result.unwrap_err(), RuleError::ForwardAndDrop { far_id: id });
            } else if !forward && !drop && !buffer {
                prop_assert_eq!(result.unwrap_err(), RuleError::NoAction { far_id: id });
            } else {
                prop_assert!(result.is_ok());
            }
        }

        #[test]
        fn prop_sequence_numbers_strictly_increase(n in 1usize..200) {
            let ids = IdAllocator::new();
            let seqs: Vec<u32> = (0..n).map(|_| ids.next_sequence_number().unwrap()).collect();
            prop_assert_eq!(seqs[0], 1);
            prop_assert!(seqs.windows(2).all(|w| w[1] == w[0] + 1));

            ids.reset_sequence_number();
            prop_assert_eq!(ids.next_sequence_number().unwrap(), 1);
        }

        #[test]
        fn prop_app_filter_fields(
            proto in prop::sample::select(vec!["udp", "tcp"]),
            addr in any::<[u8; 4]>(),
            len in 0u8..=32,
            lo in any::<u16>(),
            span in 0u16..1000,
            allow in any::<bool>(),
            precedence in any::<u32>(),
        ) {
            let hi = lo.saturating_add(span);
            let action = if allow { "allow" } else { "deny" };
            let addr = Ipv4Addr::from(addr);
            let input = format!("{proto}:{addr}/{len}:{lo}-{hi}:{action}:{precedence}");

            let filter = AppFilter::parse(&input).unwrap();
            prop_assert_eq!(filter.allow, allow);
            prop_assert_eq!(filter.precedence, precedence);
            prop_assert_eq!(
                filter.flow_description(),
                format!("permit out {proto} from {addr}/{len} {lo}-{hi} to assigned")
            );
        }

        #[test]
        fn prop_app_filter_garbage_is_invalid_format(input in "[a-z0-9:/-]{0,30}") {
            match AppFilter::parse(&input) {
                Ok(_) | Err(PfcpSimError::InvalidFormat(_)) => {}
                Err(other) => prop_assert!(false, "unexpected error {other:?}"),
            }
        }

        #[test]
        fn prop_pool_addresses_are_distinct(len in 24u8..=30) {
            let mut pool = UeAddressPool::new(&format!("17.0.0.0/{len}")).unwrap();
            let expected = (1u64 << (32 - len)) - 2;
            prop_assert_eq!(pool.remaining(), expected);

            let mut seen = std::collections::HashSet::new();
            while let Ok(addr) = pool.next_address() {
                prop_assert!(seen.insert(addr));
            }
            prop_assert_eq!(seen.len() as u64, expected);
        }
    }
}
