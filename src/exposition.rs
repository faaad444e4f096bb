//!
//! Parser for the Prometheus style text exposition format served on `/metrics`.
//!
//! Label sets are not split into key/value pairs, the raw text between the
//! braces is kept as an opaque key.
use std::collections::BTreeMap;

/// A single value as it appeared on the wire
#[derive(Debug, Clone, PartialEq)]
pub enum Sample {
    /// Value parsed as a float
    Number(f64),
    /// Value that could not be parsed as a number
    Text(String),
}

impl Sample {
    fn parse(text: &str) -> Self {
        text.parse::<f64>()
            .map_or_else(|_| Self::Text(text.to_string()), Self::Number)
    }

    /// Numeric value, if any
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

/// Value stored under a metric name
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    /// Metric reported without labels
    Scalar(Sample),
    /// Metric reported with one or more label sets, keyed by the raw label text
    Labeled(BTreeMap<String, Sample>),
}

impl MetricValue {
    /// Numeric value of an unlabeled metric
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Scalar(sample) => sample.as_f64(),
            Self::Labeled(_) => None,
        }
    }

    /// Sum of all numeric values. Text values are skipped.
    #[must_use]
    pub fn sum(&self) -> f64 {
        match self {
            Self::Scalar(sample) => sample.as_f64().unwrap_or_default(),
            Self::Labeled(entries) => entries.values().filter_map(Sample::as_f64).sum(),
        }
    }
}

/// All metrics from one scrape
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    metrics: BTreeMap<String, MetricValue>,
}

impl MetricsSnapshot {
    /// Look up a metric by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&MetricValue> {
        self.metrics.get(name)
    }

    /// Numeric value of an unlabeled metric
    #[must_use]
    pub fn scalar(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(MetricValue::as_f64)
    }

    /// Sum over every label set of a metric
    #[must_use]
    pub fn sum(&self, name: &str) -> Option<f64> {
        self.get(name).map(MetricValue::sum)
    }

    /// Number of distinct metric names
    #[must_use]
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// True when the scrape produced nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Iterate over metric names and values in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricValue)> {
        self.metrics.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn insert_scalar(&mut self, name: &str, sample: Sample) {
        match self.metrics.get_mut(name) {
            // labeled form takes precedence over a bare value
            Some(MetricValue::Labeled(_)) => {
                tracing::debug!("ignoring unlabeled sample for labeled metric {}", name);
            }
            Some(slot) => *slot = MetricValue::Scalar(sample),
            None => {
                self.metrics
                    .insert(name.to_string(), MetricValue::Scalar(sample));
            }
        }
    }

    fn insert_labeled(&mut self, name: &str, labels: &str, sample: Sample) {
        let slot = self
            .metrics
            .entry(name.to_string())
            .or_insert_with(|| MetricValue::Labeled(BTreeMap::new()));
        if let MetricValue::Scalar(_) = slot {
            *slot = MetricValue::Labeled(BTreeMap::new());
        }
        if let MetricValue::Labeled(entries) = slot {
            entries.insert(labels.to_string(), sample);
        }
    }
}

/// Parse exposition text. Lines that do not match are skipped, so this never fails.
#[must_use]
pub fn parse(text: &str) -> MetricsSnapshot {
    let mut snapshot = MetricsSnapshot::default();

    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.contains('{') {
            match split_labeled(line) {
                Some((name, labels, value)) => {
                    snapshot.insert_labeled(name, labels, Sample::parse(value));
                }
                None => tracing::debug!("skipping malformed metric line: {}", line),
            }
        } else {
            match line.split_once(char::is_whitespace) {
                Some((name, value)) => {
                    snapshot.insert_scalar(name, Sample::parse(value.trim_start()));
                }
                None => tracing::debug!("skipping metric line without value: {}", line),
            }
        }
    }

    snapshot
}

/// Split `name{labels} value`
fn split_labeled(line: &str) -> Option<(&str, &str, &str)> {
    let (name, rest) = line.split_once('{')?;
    let (labels, value) = rest.rsplit_once('}')?;
    let value = value.trim();

    if name.is_empty() || name.contains(char::is_whitespace) || value.is_empty() {
        return None;
    }

    Some((name, labels, value))
}
