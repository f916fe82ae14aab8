// ─────────────────────────────────────────────────────────────────────
// SCB QC Rig — Channel Map
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Board channel table and ADG732 multiplexer routing.
//!
//! Each logical channel pairs a MUX1 switch `sN` with a MUX2 switch `sM`.
//! Switch `sN` is selected by writing the 5-bit address `N − 1`, MSB first,
//! onto the mux address pins.

use crate::instrument::Router;
use scbqc_types::error::{QcError, QcResult};
use scbqc_types::state::ChannelId;
use std::collections::BTreeMap;

/// MUX1 address pins (board numbering), MSB first.
pub const MUX1_ADDRESS_PINS: [u8; 5] = [10, 8, 7, 5, 3];

/// MUX2 address pins (board numbering), MSB first.
pub const MUX2_ADDRESS_PINS: [u8; 5] = [29, 31, 33, 35, 37];

/// (MUX1 switch, MUX2 switch, channel name) in acquisition order.
const STANDARD_ROUTES: [(u8, u8, &str); 24] = [
    (3, 17, "PTA1"),
    (4, 18, "PTB1"),
    (5, 19, "PTA2"),
    (6, 20, "PTB2"),
    (7, 21, "PTA3"),
    (8, 22, "PTB3"),
    (9, 23, "PTA4"),
    (10, 24, "PTB4"),
    (11, 25, "PTA5"),
    (12, 26, "PTB5"),
    (13, 27, "PTA6"),
    (14, 28, "PTB6"),
    (28, 14, "PTA7"),
    (27, 13, "PTB7"),
    (26, 12, "PTA8"),
    (25, 11, "PTB8"),
    (24, 10, "PTA9"),
    (23, 9, "PTB9"),
    (22, 8, "PTA10"),
    (21, 7, "PTB10"),
    (20, 6, "PTA11"),
    (19, 5, "PTB11"),
    (18, 4, "PTA12"),
    (17, 3, "PTB12"),
];

/// Switches per ADG732, numbered `s1`…`s32`.
pub const MUX_SWITCHES: u8 = 32;

fn switch_address(switch: u8) -> Option<u8> {
    (1..=MUX_SWITCHES).contains(&switch).then(|| switch - 1)
}

/// Switch pair that connects one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelRoute {
    pub mux1_switch: u8,
    pub mux2_switch: u8,
}

impl ChannelRoute {
    /// Fails with `ConfigError` unless both switches are in `1..=32`.
    pub fn new(mux1_switch: u8, mux2_switch: u8) -> QcResult<Self> {
        let route = ChannelRoute {
            mux1_switch,
            mux2_switch,
        };
        if route.mux1_address().is_none() || route.mux2_address().is_none() {
            return Err(QcError::ConfigError(format!(
                "switch pair s{mux1_switch}/s{mux2_switch} outside s1..s{MUX_SWITCHES}"
            )));
        }
        Ok(route)
    }

    /// `None` when the switch is not on the mux.
    pub fn mux1_address(&self) -> Option<u8> {
        switch_address(self.mux1_switch)
    }

    pub fn mux2_address(&self) -> Option<u8> {
        switch_address(self.mux2_switch)
    }
}

/// 5-bit address as pin levels, MSB first.
pub fn address_bits(address: u8) -> [bool; 5] {
    let mut bits = [false; 5];
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = (address >> (4 - i)) & 1 == 1;
    }
    bits
}

/// Channel name → switch pair.
#[derive(Debug, Clone, Default)]
pub struct ChannelMap {
    routes: BTreeMap<ChannelId, ChannelRoute>,
}

impl ChannelMap {
    /// The 24-channel board layout (`PTA1`…`PTA12`, `PTB1`…`PTB12`).
    pub fn standard() -> Self {
        let routes = STANDARD_ROUTES
            .iter()
            .map(|&(mux1_switch, mux2_switch, name)| {
                (
                    ChannelId::from(name),
                    ChannelRoute {
                        mux1_switch,
                        mux2_switch,
                    },
                )
            })
            .collect();
        ChannelMap { routes }
    }

    /// Add or replace a channel. Switches are 1-based, `s1`…`s32`.
    pub fn insert(
        &mut self,
        channel: ChannelId,
        mux1_switch: u8,
        mux2_switch: u8,
    ) -> QcResult<()> {
        let route = ChannelRoute::new(mux1_switch, mux2_switch)?;
        self.routes.insert(channel, route);
        Ok(())
    }

    pub fn route(&self, channel: &ChannelId) -> Option<ChannelRoute> {
        self.routes.get(channel).copied()
    }

    /// Channels in deterministic order.
    pub fn channels(&self) -> Vec<ChannelId> {
        self.routes.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Digital output lines driving the mux address pins.
pub trait PinBus {
    fn write_pin(&mut self, pin: u8, high: bool) -> QcResult<()>;
}

/// [`Router`] that sets both mux addresses through a [`PinBus`].
pub struct MuxRouter<P: PinBus> {
    map: ChannelMap,
    pins: P,
}

impl<P: PinBus> MuxRouter<P> {
    pub fn new(map: ChannelMap, pins: P) -> Self {
        Self { map, pins }
    }

    pub fn pins(&self) -> &P {
        &self.pins
    }

    fn write_address(&mut self, pins: [u8; 5], address: u8) -> QcResult<()> {
        for (pin, level) in pins.into_iter().zip(address_bits(address)) {
            self.pins.write_pin(pin, level)?;
        }
        Ok(())
    }
}

impl<P: PinBus> Router for MuxRouter<P> {
    fn select(&mut self, channel: &ChannelId) -> QcResult<()> {
        let route = self.map.route(channel).ok_or_else(|| QcError::Routing {
            channel: channel.to_string(),
            message: "channel is not in the channel map".to_string(),
        })?;
        let (Some(mux1), Some(mux2)) = (route.mux1_address(), route.mux2_address()) else {
            return Err(QcError::Routing {
                channel: channel.to_string(),
                message: format!(
                    "switch pair s{}/s{} is not on the mux",
                    route.mux1_switch, route.mux2_switch
                ),
            });
        };
        self.write_address(MUX1_ADDRESS_PINS, mux1)?;
        self.write_address(MUX2_ADDRESS_PINS, mux2)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingPins {
        writes: Vec<(u8, bool)>,
    }

    impl PinBus for RecordingPins {
        fn write_pin(&mut self, pin: u8, high: bool) -> QcResult<()> {
            self.writes.push((pin, high));
            Ok(())
        }
    }

    #[test]
    fn test_standard_map_has_24_channels_in_order() {
        let map = ChannelMap::standard();
        assert_eq!(map.len(), 24);
        let channels = map.channels();
        assert_eq!(channels[0].as_str(), "PTA1");
        assert_eq!(channels[1].as_str(), "PTA2");
        assert_eq!(channels[11].as_str(), "PTA12");
        assert_eq!(channels[12].as_str(), "PTB1");
        assert_eq!(channels[23].as_str(), "PTB12");
    }

    #[test]
    fn test_routes_are_mirrored_pairs() {
        let map = ChannelMap::standard();
        let pta1 = map.route(&ChannelId::from("PTA1")).unwrap();
        let ptb12 = map.route(&ChannelId::from("PTB12")).unwrap();
        assert_eq!((pta1.mux1_switch, pta1.mux2_switch), (3, 17));
        assert_eq!((ptb12.mux1_switch, ptb12.mux2_switch), (17, 3));
    }

    #[test]
    fn test_address_bits_msb_first() {
        // s3 → 00010, s28 → 11011
        assert_eq!(address_bits(2), [false, false, false, true, false]);
        assert_eq!(address_bits(27), [true, true, false, true, true]);
    }

    #[test]
    fn test_mux_router_writes_both_addresses() {
        let mut router = MuxRouter::new(ChannelMap::standard(), RecordingPins::default());
        router.select(&ChannelId::from("PTA1")).unwrap();
        let writes = &router.pins().writes;
        assert_eq!(writes.len(), 10);
        // MUX1 ← s3 (00010)
        assert_eq!(
            &writes[..5],
            &[(10, false), (8, false), (7, false), (5, true), (3, false)]
        );
        // MUX2 ← s17 (10000)
        assert_eq!(
            &writes[5..],
            &[(29, true), (31, false), (33, false), (35, false), (37, false)]
        );
    }

    #[test]
    fn test_standard_routes_are_on_the_mux() {
        let map = ChannelMap::standard();
        for ch in map.channels() {
            let route = map.route(&ch).unwrap();
            assert!(ChannelRoute::new(route.mux1_switch, route.mux2_switch).is_ok(), "{ch}");
        }
    }

    #[test]
    fn test_insert_rejects_switch_off_the_mux() {
        let mut map = ChannelMap::default();
        for (mux1, mux2) in [(33, 3), (3, 33), (0, 3), (3, 0)] {
            assert!(matches!(
                map.insert(ChannelId::from("PTC1"), mux1, mux2),
                Err(QcError::ConfigError(_))
            ));
        }
        assert!(map.is_empty());
        map.insert(ChannelId::from("PTC1"), 32, 1).unwrap();
        assert_eq!(map.route(&ChannelId::from("PTC1")).unwrap().mux1_address(), Some(31));
    }

    #[test]
    fn test_select_refuses_route_off_the_mux() {
        let mut map = ChannelMap::standard();
        // s33 would alias to address 00000 (s1) if truncated to 5 bits
        map.routes.insert(
            ChannelId::from("PTC1"),
            ChannelRoute {
                mux1_switch: 33,
                mux2_switch: 3,
            },
        );
        let mut router = MuxRouter::new(map, RecordingPins::default());
        assert!(matches!(
            router.select(&ChannelId::from("PTC1")),
            Err(QcError::Routing { .. })
        ));
        assert!(router.pins().writes.is_empty());
    }

    #[test]
    fn test_unknown_channel_is_routing_error() {
        let mut router = MuxRouter::new(ChannelMap::standard(), RecordingPins::default());
        match router.select(&ChannelId::from("PTC1")) {
            Err(QcError::Routing { channel, .. }) => assert_eq!(channel, "PTC1"),
            other => panic!("expected routing error, got {other:?}"),
        }
        assert!(router.pins().writes.is_empty());
    }
}
