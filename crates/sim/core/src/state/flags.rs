use std::collections::BTreeMap;

use bitflags::bitflags;

bitflags! {
    /// Collision categories carried by tiles, actor shapes and sensor masks.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct CollisionFlags: u32 {
        const SOLID      = 1 << 0;
        const WATER      = 1 << 1;
        const ACTOR      = 1 << 2;
        const PLAYER     = 1 << 3;
        const PROJECTILE = 1 << 4;

        // Content may define further categories.
        const _ = !0;
    }
}

bitflags! {
    /// Replicated per-actor state bits.
    ///
    /// The low byte is reserved for built-in bits; names declared in an actor
    /// config's `flags` list are assigned from [`ActorFlags::FIRST_CUSTOM_BIT`] up.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ActorFlags: u32 {
        /// Set by a warp; cleared on the next tick.
        const WARP   = 1 << 0;
        /// Mirrors the mobile movement intent.
        const MOVING = 1 << 1;

        const _ = !0;
    }
}

impl ActorFlags {
    pub const FIRST_CUSTOM_BIT: u32 = 8;
    pub const MAX_CUSTOM_FLAGS: usize = (u32::BITS - Self::FIRST_CUSTOM_BIT) as usize;
}

/// Name-to-bit table for one actor config.
///
/// Replaces reflective field lookup: `SetFlag`/`FlagSet` resolve a flag name
/// here and an unknown name is treated as absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlagTable {
    bits: BTreeMap<String, ActorFlags>,
}

impl FlagTable {
    pub fn new(custom: &[String]) -> Self {
        let mut bits = BTreeMap::new();
        bits.insert("warp".to_owned(), ActorFlags::WARP);
        bits.insert("moving".to_owned(), ActorFlags::MOVING);

        for (index, name) in custom.iter().take(ActorFlags::MAX_CUSTOM_FLAGS).enumerate() {
            let bit = ActorFlags::from_bits_retain(1 << (ActorFlags::FIRST_CUSTOM_BIT + index as u32));
            bits.entry(name.clone()).or_insert(bit);
        }
        if custom.len() > ActorFlags::MAX_CUSTOM_FLAGS {
            tracing::warn!(
                target: "sim::scene",
                declared = custom.len(),
                max = ActorFlags::MAX_CUSTOM_FLAGS,
                "Too many custom actor flags; extra names ignored"
            );
        }

        Self { bits }
    }

    pub fn get(&self, name: &str) -> Option<ActorFlags> {
        self.bits.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bits.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_and_custom_names_resolve() {
        let table = FlagTable::new(&["open".to_owned(), "lit".to_owned()]);
        assert_eq!(table.get("warp"), Some(ActorFlags::WARP));
        assert_eq!(table.get("moving"), Some(ActorFlags::MOVING));
        assert_eq!(table.get("open"), Some(ActorFlags::from_bits_retain(1 << 8)));
        assert_eq!(table.get("lit"), Some(ActorFlags::from_bits_retain(1 << 9)));
        assert_eq!(table.get("missing"), None);
    }

    #[test]
    fn custom_names_cannot_shadow_builtins() {
        let table = FlagTable::new(&["warp".to_owned()]);
        assert_eq!(table.get("warp"), Some(ActorFlags::WARP));
    }
}
