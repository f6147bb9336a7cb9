use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Patient registrations per calendar month of one year.
///
/// Always carries all twelve months; serializes as a JSON object keyed by
/// English month name in calendar order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "BTreeMap<String, u32>")]
pub struct MonthlyCounts {
    counts: [u32; 12],
}

impl MonthlyCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlay a count for `month` (1-based). Out-of-range months are ignored.
    pub fn set(&mut self, month: u32, count: u32) {
        if (1..=12).contains(&month) {
            self.counts[(month - 1) as usize] = count;
        }
    }

    /// Count for `month` (1-based), zero when out of range.
    pub fn get(&self, month: u32) -> u32 {
        if (1..=12).contains(&month) {
            self.counts[(month - 1) as usize]
        } else {
            0
        }
    }

    pub fn by_name(&self, name: &str) -> Option<u32> {
        MONTH_NAMES
            .iter()
            .position(|m| *m == name)
            .map(|i| self.counts[i])
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u32)> + '_ {
        MONTH_NAMES.iter().copied().zip(self.counts.iter().copied())
    }
}

impl Serialize for MonthlyCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(12))?;
        for (name, count) in self.iter() {
            map.serialize_entry(name, &count)?;
        }
        map.end()
    }
}

impl TryFrom<BTreeMap<String, u32>> for MonthlyCounts {
    type Error = String;

    fn try_from(map: BTreeMap<String, u32>) -> Result<Self, Self::Error> {
        let mut counts = MonthlyCounts::new();
        for (name, count) in map {
            let index = MONTH_NAMES
                .iter()
                .position(|m| *m == name)
                .ok_or_else(|| format!("unknown month: {name}"))?;
            counts.counts[index] = count;
        }
        Ok(counts)
    }
}
