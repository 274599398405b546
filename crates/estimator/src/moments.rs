//! Raw moment storage and the per-thread history staging
//!
//! Every thread owns a [ThreadSlot] holding its uncommitted history buffers
//! and its share of the committed moments. Slots are only ever summed, so
//! the estimator state is the element-wise sum of all of them.

// external crates
use itertools::izip;
use serde::{Deserialize, Serialize};

/// Sizes shared by every slot of an estimator
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Layout {
    pub entities: usize,
    pub bins: usize,
    pub responses: usize,
    pub totals: bool,
}

impl Layout {
    /// Length of the bin moment arrays, one value per bin and response
    pub fn bin_values(&self) -> usize {
        self.bins * self.responses
    }

    /// Length of the total moment arrays
    pub fn total_values(&self) -> usize {
        if self.totals {
            self.responses
        } else {
            0
        }
    }

    /// Length of a flattened slot, see [ThreadSlot::to_flat]
    pub fn flat_len(&self) -> usize {
        (self.entities + 1) * (2 * self.bin_values() + 4 * self.total_values())
    }
}

/// First and second moments of every bin
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct BinMoments {
    pub first: Vec<f64>,
    pub second: Vec<f64>,
}

impl BinMoments {
    pub fn new(length: usize) -> Self {
        Self {
            first: vec![0.0; length],
            second: vec![0.0; length],
        }
    }

    pub fn add_sample(&mut self, index: usize, sample: f64) {
        self.first[index] += sample;
        self.second[index] += sample * sample;
    }

    pub fn merge(&mut self, other: &Self) {
        add_into(&mut self.first, &other.first);
        add_into(&mut self.second, &other.second);
    }

    fn arrays(&self) -> [&Vec<f64>; 2] {
        [&self.first, &self.second]
    }

    fn arrays_mut(&mut self) -> [&mut Vec<f64>; 2] {
        [&mut self.first, &mut self.second]
    }
}

/// First to fourth moments of the per-history totals
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct TotalMoments {
    pub first: Vec<f64>,
    pub second: Vec<f64>,
    pub third: Vec<f64>,
    pub fourth: Vec<f64>,
}

impl TotalMoments {
    pub fn new(length: usize) -> Self {
        Self {
            first: vec![0.0; length],
            second: vec![0.0; length],
            third: vec![0.0; length],
            fourth: vec![0.0; length],
        }
    }

    pub fn add_sample(&mut self, index: usize, sample: f64) {
        let squared = sample * sample;
        self.first[index] += sample;
        self.second[index] += squared;
        self.third[index] += squared * sample;
        self.fourth[index] += squared * squared;
    }

    pub fn merge(&mut self, other: &Self) {
        for (a, b) in self.arrays_mut().into_iter().zip(other.arrays()) {
            add_into(a, b);
        }
    }

    pub fn arrays(&self) -> [&Vec<f64>; 4] {
        [&self.first, &self.second, &self.third, &self.fourth]
    }

    fn arrays_mut(&mut self) -> [&mut Vec<f64>; 4] {
        [
            &mut self.first,
            &mut self.second,
            &mut self.third,
            &mut self.fourth,
        ]
    }
}

fn add_into(target: &mut [f64], source: &[f64]) {
    for (t, s) in target.iter_mut().zip(source) {
        *t += s;
    }
}

/// Everything one thread writes to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ThreadSlot {
    /// Contributions of the current history, per entity
    uncommitted: Vec<Vec<f64>>,
    /// Entities with contributions in the current history
    touched: Vec<usize>,
    pub entity_bins: Vec<BinMoments>,
    pub entity_totals: Vec<TotalMoments>,
    pub total_bins: BinMoments,
    pub total_totals: TotalMoments,
}

impl ThreadSlot {
    pub fn new(layout: &Layout) -> Self {
        let bins = layout.bin_values();
        let totals = layout.total_values();

        Self {
            uncommitted: vec![vec![0.0; bins]; layout.entities],
            touched: Vec::new(),
            entity_bins: vec![BinMoments::new(bins); layout.entities],
            entity_totals: vec![TotalMoments::new(totals); layout.entities],
            total_bins: BinMoments::new(bins),
            total_totals: TotalMoments::new(totals),
        }
    }

    /// Add to the uncommitted buffer of an entity
    pub fn add_uncommitted(&mut self, entity: usize, index: usize, value: f64) {
        if value == 0.0 {
            return;
        }
        if !self.touched.contains(&entity) {
            self.touched.push(entity);
        }
        self.uncommitted[entity][index] += value;
    }

    pub fn has_uncommitted(&self) -> bool {
        self.touched
            .iter()
            .any(|e| self.uncommitted[*e].iter().any(|v| *v != 0.0))
    }

    /// Fold the current history into the moments and clear the buffers
    ///
    /// Each bin sees one sample per history, so every moment is taken after
    /// summing all contributions of the history.
    pub fn commit(&mut self, layout: &Layout) {
        if self.touched.is_empty() {
            return;
        }

        let mut bin_sums = vec![0.0; layout.bin_values()];
        let mut total_sums = vec![0.0; layout.responses];

        for &entity in &self.touched {
            let buffer = &mut self.uncommitted[entity];
            let mut entity_sums = vec![0.0; layout.responses];

            for (index, value) in buffer.iter().enumerate() {
                if *value == 0.0 {
                    continue;
                }
                self.entity_bins[entity].add_sample(index, *value);
                bin_sums[index] += value;
                entity_sums[index % layout.responses] += value;
            }

            if layout.totals {
                for (response, sum) in entity_sums.iter().enumerate() {
                    self.entity_totals[entity].add_sample(response, *sum);
                }
            }

            add_into(&mut total_sums, &entity_sums);
            buffer.fill(0.0);
        }

        for (index, sum) in bin_sums.iter().enumerate() {
            if *sum != 0.0 {
                self.total_bins.add_sample(index, *sum);
            }
        }

        if layout.totals {
            for (response, sum) in total_sums.iter().enumerate() {
                self.total_totals.add_sample(response, *sum);
            }
        }

        self.touched.clear();
    }

    /// True if every array has the size the layout asks for
    pub fn fits(&self, layout: &Layout) -> bool {
        let bins = layout.bin_values();
        let totals = layout.total_values();
        let bin_fits = |m: &BinMoments| m.arrays().iter().all(|a| a.len() == bins);
        let total_fits = |m: &TotalMoments| m.arrays().iter().all(|a| a.len() == totals);

        self.uncommitted.len() == layout.entities
            && self.uncommitted.iter().all(|b| b.len() == bins)
            && self.touched.iter().all(|e| *e < layout.entities)
            && self.entity_bins.len() == layout.entities
            && self.entity_bins.iter().all(bin_fits)
            && self.entity_totals.len() == layout.entities
            && self.entity_totals.iter().all(total_fits)
            && bin_fits(&self.total_bins)
            && total_fits(&self.total_totals)
    }

    /// Drop everything, committed or not
    pub fn reset(&mut self, layout: &Layout) {
        *self = Self::new(layout);
    }

    /// Add the committed moments of another slot
    pub fn merge(&mut self, other: &Self) {
        for (a, b) in izip!(&mut self.entity_bins, &other.entity_bins) {
            a.merge(b);
        }
        for (a, b) in izip!(&mut self.entity_totals, &other.entity_totals) {
            a.merge(b);
        }
        self.total_bins.merge(&other.total_bins);
        self.total_totals.merge(&other.total_totals);
    }

    /// Committed moments as one contiguous array
    ///
    /// Entity bin and total moments in entity order, then the estimator-wide
    /// bin and total moments.
    pub fn to_flat(&self) -> Vec<f64> {
        let mut flat = Vec::new();
        for (bins, totals) in izip!(&self.entity_bins, &self.entity_totals) {
            extend_flat(&mut flat, bins, totals);
        }
        extend_flat(&mut flat, &self.total_bins, &self.total_totals);
        flat
    }

    /// Overwrite the committed moments from [ThreadSlot::to_flat] output
    ///
    /// The caller guarantees the length matches the layout.
    pub fn load_flat(&mut self, flat: &[f64]) {
        let mut values = flat.iter().copied();
        for (bins, totals) in izip!(&mut self.entity_bins, &mut self.entity_totals) {
            load_flat(&mut values, bins, totals);
        }
        load_flat(&mut values, &mut self.total_bins, &mut self.total_totals);
    }
}

fn extend_flat(flat: &mut Vec<f64>, bins: &BinMoments, totals: &TotalMoments) {
    for array in bins.arrays() {
        flat.extend_from_slice(array);
    }
    for array in totals.arrays() {
        flat.extend_from_slice(array);
    }
}

fn load_flat(values: &mut impl Iterator<Item = f64>, bins: &mut BinMoments, totals: &mut TotalMoments) {
    for array in bins.arrays_mut() {
        for (target, value) in array.iter_mut().zip(values.by_ref()) {
            *target = value;
        }
    }
    for array in totals.arrays_mut() {
        for (target, value) in array.iter_mut().zip(values.by_ref()) {
            *target = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn layout() -> Layout {
        Layout {
            entities: 2,
            bins: 3,
            responses: 2,
            totals: true,
        }
    }

    #[rstest]
    fn sum_then_square(layout: Layout) {
        let mut slot = ThreadSlot::new(&layout);
        slot.add_uncommitted(0, 2, 1.0);
        slot.add_uncommitted(0, 2, 2.0);
        assert!(slot.has_uncommitted());

        slot.commit(&layout);
        assert!(!slot.has_uncommitted());
        assert_eq!(slot.entity_bins[0].first[2], 3.0);
        assert_eq!(slot.entity_bins[0].second[2], 9.0);
    }

    #[rstest]
    fn totals_sum_over_bins_per_response(layout: Layout) {
        let mut slot = ThreadSlot::new(&layout);
        // bins 0 and 2 of response 0, bin 1 of response 1
        slot.add_uncommitted(1, 0, 1.0);
        slot.add_uncommitted(1, 4, 2.0);
        slot.add_uncommitted(1, 3, 5.0);
        slot.add_uncommitted(0, 4, 1.0);
        slot.commit(&layout);

        assert_eq!(slot.entity_totals[1].first, vec![3.0, 5.0]);
        assert_eq!(slot.entity_totals[1].second, vec![9.0, 25.0]);
        assert_eq!(slot.entity_totals[1].fourth, vec![81.0, 625.0]);

        // estimator-wide bins sum over entities before squaring
        assert_eq!(slot.total_bins.first[4], 3.0);
        assert_eq!(slot.total_bins.second[4], 9.0);
        assert_eq!(slot.total_totals.first, vec![4.0, 5.0]);
        assert_eq!(slot.total_totals.second, vec![16.0, 25.0]);
    }

    #[rstest]
    fn zero_contributions_are_not_staged(layout: Layout) {
        let mut slot = ThreadSlot::new(&layout);
        slot.add_uncommitted(0, 0, 0.0);
        assert!(!slot.has_uncommitted());
    }

    #[rstest]
    fn flat_round_trip(layout: Layout) {
        let mut slot = ThreadSlot::new(&layout);
        slot.add_uncommitted(0, 1, 2.0);
        slot.add_uncommitted(1, 5, 3.0);
        slot.commit(&layout);

        let flat = slot.to_flat();
        assert_eq!(flat.len(), layout.flat_len());

        let mut restored = ThreadSlot::new(&layout);
        restored.load_flat(&flat);
        assert_eq!(restored, slot);
    }

    #[rstest]
    fn disabled_totals() {
        let layout = Layout {
            entities: 1,
            bins: 2,
            responses: 1,
            totals: false,
        };
        let mut slot = ThreadSlot::new(&layout);
        slot.add_uncommitted(0, 1, 2.0);
        slot.commit(&layout);

        assert!(slot.entity_totals[0].first.is_empty());
        assert!(slot.total_totals.first.is_empty());
        assert_eq!(slot.to_flat().len(), layout.flat_len());
    }

    #[rstest]
    fn slot_sizes(layout: Layout) {
        let mut slot = ThreadSlot::new(&layout);
        assert!(slot.fits(&layout));
        assert!(!slot.fits(&Layout { bins: 2, ..layout }));
        assert!(!slot.fits(&Layout { totals: false, ..layout }));

        slot.entity_totals[1].third.pop();
        assert!(!slot.fits(&layout));
    }
}
