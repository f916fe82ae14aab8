// ─────────────────────────────────────────────────────────────────────
// SCB QC Rig — Combined Delta Table
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Cross-channel delta table.
//!
//! Columns keep their channel's own row count; the table's row count is
//! the reference length (the longest column, earliest channel on ties).
//! Reads past a column's end give `None`, so a short channel is back-filled
//! with explicit absent cells and nothing is truncated.

use scbqc_types::state::{ChannelId, ChannelSeries};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Header of the reference column.
pub const REFERENCE_HEADER: &str = "Temperature VRB";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct DeltaColumn {
    deltas: Vec<Option<f64>>,
    temperature_vrb: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinedDeltaTable {
    columns: BTreeMap<ChannelId, DeltaColumn>,
}

impl CombinedDeltaTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the column of `series.channel`.
    pub fn add_channel(&mut self, series: &ChannelSeries) {
        self.columns.insert(
            series.channel.clone(),
            DeltaColumn {
                deltas: series.deltas(),
                temperature_vrb: series.vrb_temperatures(),
            },
        );
    }

    pub fn remove_channel(&mut self, channel: &ChannelId) -> bool {
        self.columns.remove(channel).is_some()
    }

    /// Channel whose series sets the row count and the VRB column.
    pub fn reference_channel(&self) -> Option<&ChannelId> {
        let mut best: Option<(&ChannelId, usize)> = None;
        for (id, col) in &self.columns {
            let len = col.deltas.len();
            if best.map_or(true, |(_, best_len)| len > best_len) {
                best = Some((id, len));
            }
        }
        best.map(|(id, _)| id)
    }

    pub fn row_count(&self) -> usize {
        self.reference_channel()
            .and_then(|id| self.columns.get(id))
            .map_or(0, |col| col.deltas.len())
    }

    /// Channel columns in channel order.
    pub fn channels(&self) -> Vec<ChannelId> {
        self.columns.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Reference VRB temperatures, one per row.
    pub fn reference_column(&self) -> Vec<Option<f64>> {
        self.reference_channel()
            .and_then(|id| self.columns.get(id))
            .map(|col| col.temperature_vrb.clone())
            .unwrap_or_default()
    }

    /// Delta column of `channel`, padded with `None` to the row count.
    pub fn column(&self, channel: &ChannelId) -> Option<Vec<Option<f64>>> {
        let rows = self.row_count();
        self.columns
            .get(channel)
            .map(|col| (0..rows).map(|i| col.deltas.get(i).copied().flatten()).collect())
    }

    /// Column headers: the reference column, then one per channel.
    pub fn headers(&self) -> Vec<String> {
        std::iter::once(REFERENCE_HEADER.to_string())
            .chain(self.columns.keys().map(ChannelId::to_string))
            .collect()
    }

    /// Rows of `[reference, delta_ch1, delta_ch2, ...]`, all the same width.
    pub fn rows(&self) -> Vec<Vec<Option<f64>>> {
        let reference = self.reference_column();
        (0..self.row_count())
            .map(|i| {
                std::iter::once(reference.get(i).copied().flatten())
                    .chain(
                        self.columns
                            .values()
                            .map(|col| col.deltas.get(i).copied().flatten()),
                    )
                    .collect()
            })
            .collect()
    }
}
