use std::fmt::Display;

/// Summary of a set of integer samples, such as leaf depths or leaf sizes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Stats {
    pub count: usize,
    min: usize,
    max: usize,
    sum: usize,
}

impl Stats {
    pub fn single(value: usize) -> Self {
        Stats {
            count: 1,
            min: value,
            max: value,
            sum: value,
        }
    }

    pub fn add(&mut self, value: usize) {
        *self = self.merge(&Stats::single(value));
    }

    /// Smallest sample, None if there are no samples.
    pub fn min(&self) -> Option<usize> {
        (self.count > 0).then_some(self.min)
    }

    pub fn max(&self) -> Option<usize> {
        (self.count > 0).then_some(self.max)
    }

    pub fn mean(&self) -> Option<f32> {
        (self.count > 0).then(|| self.sum as f32 / self.count as f32)
    }

    pub fn merge(&self, other: &Self) -> Self {
        match (self.count, other.count) {
            (0, _) => other.clone(),
            (_, 0) => self.clone(),
            _ => Stats {
                count: self.count + other.count,
                min: self.min.min(other.min),
                max: self.max.max(other.max),
                sum: self.sum + other.sum,
            },
        }
    }

    /// Adds `offset` to every sample.
    pub fn offset(&self, offset: usize) -> Self {
        if self.count == 0 {
            return self.clone();
        }
        Stats {
            count: self.count,
            min: self.min + offset,
            max: self.max + offset,
            sum: self.sum + offset * self.count,
        }
    }
}

impl Extend<usize> for Stats {
    fn extend<I: IntoIterator<Item = usize>>(&mut self, iter: I) {
        for value in iter {
            self.add(value);
        }
    }
}

impl FromIterator<usize> for Stats {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut stats = Stats::default();
        stats.extend(iter);
        stats
    }
}

impl Display for Stats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.mean() {
            Some(mean) => write!(
                f,
                "{}..={} (mean {:.1}, {} samples)",
                self.min, self.max, mean, self.count
            ),
            None => write!(f, "no samples"),
        }
    }
}
