use std::io::Write;

use parking_lot::Mutex;

use crate::metrics::snapshot::{CacheStatisticsSnapshot, StatisticsReport, TierStatisticsSnapshot};
use crate::metrics::traits::MetricsExporter;

/// Prometheus text exporter for cache statistics.
///
/// This exporter writes in the Prometheus text exposition format so it can be
/// scraped by Prometheus or forwarded to an OpenTelemetry collector. A single
/// [`CacheStatisticsSnapshot`] is written unlabelled; a [`StatisticsReport`]
/// is written with `cache` and `tier` labels.
#[derive(Debug)]
pub struct PrometheusTextExporter<W: Write + Send + Sync> {
    prefix: String,
    writer: Mutex<W>,
}

type CacheField = fn(&CacheStatisticsSnapshot) -> u64;
type TierField = fn(&TierStatisticsSnapshot) -> Option<u64>;

const CACHE_COUNTERS: &[(&str, CacheField)] = &[
    ("cache_gets_total", |s| s.cache_gets),
    ("cache_hits_total", |s| s.cache_hits),
    ("cache_misses_total", |s| s.cache_misses),
    ("cache_puts_total", |s| s.cache_puts),
    ("cache_removals_total", |s| s.cache_removals),
    ("cache_evictions_total", |s| s.cache_evictions),
    ("cache_expirations_total", |s| s.cache_expirations),
];

const TIER_COUNTERS: &[(&str, TierField)] = &[
    ("tier_hits_total", |s| Some(s.hits)),
    ("tier_misses_total", |s| Some(s.misses)),
    ("tier_puts_total", |s| Some(s.puts)),
    ("tier_removals_total", |s| Some(s.removals)),
    ("tier_evictions_total", |s| Some(s.evictions)),
    ("tier_expirations_total", |s| Some(s.expirations)),
];

impl<W: Write + Send + Sync> PrometheusTextExporter<W> {
    pub fn new(prefix: impl Into<String>, writer: W) -> Self {
        Self {
            prefix: prefix.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Consumes the exporter and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn write_header(writer: &mut W, name: &str, kind: &str) {
        let _ = writeln!(writer, "# TYPE {} {}", name, kind);
    }

    fn write_sample(writer: &mut W, name: &str, labels: &[(&str, &str)], value: u64) {
        if labels.is_empty() {
            let _ = writeln!(writer, "{} {}", name, value);
            return;
        }
        let rendered: Vec<String> = labels
            .iter()
            .map(|(key, val)| format!("{}=\"{}\"", key, escape_label(val)))
            .collect();
        let _ = writeln!(writer, "{}{{{}}} {}", name, rendered.join(","), value);
    }

    fn metric_name(&self, suffix: &str) -> String {
        if self.prefix.is_empty() {
            suffix.to_string()
        } else {
            format!("{}_{}", self.prefix, suffix)
        }
    }
}

/// Escapes `\`, `"` and newlines in a label value.
fn escape_label(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

impl<W: Write + Send + Sync> MetricsExporter<CacheStatisticsSnapshot>
    for PrometheusTextExporter<W>
{
    fn export(&self, snapshot: &CacheStatisticsSnapshot) {
        let mut writer = self.writer.lock();
        for (suffix, field) in CACHE_COUNTERS {
            let name = self.metric_name(suffix);
            Self::write_header(&mut writer, &name, "counter");
            Self::write_sample(&mut writer, &name, &[], field(snapshot));
        }
    }
}

impl<W: Write + Send + Sync> MetricsExporter<StatisticsReport> for PrometheusTextExporter<W> {
    fn export(&self, report: &StatisticsReport) {
        let mut writer = self.writer.lock();

        for (suffix, field) in CACHE_COUNTERS {
            let name = self.metric_name(suffix);
            Self::write_header(&mut writer, &name, "counter");
            for cache in &report.caches {
                Self::write_sample(
                    &mut writer,
                    &name,
                    &[("cache", cache.alias.as_str())],
                    field(&cache.cache),
                );
            }
        }

        let tier_metrics = TIER_COUNTERS
            .iter()
            .map(|(suffix, field)| (*suffix, "counter", *field))
            .chain(std::iter::once((
                "tier_mappings",
                "gauge",
                (|s: &TierStatisticsSnapshot| s.mappings) as TierField,
            )));
        for (suffix, kind, field) in tier_metrics {
            let name = self.metric_name(suffix);
            let mut header_written = false;
            for cache in &report.caches {
                for (tier, snapshot) in &cache.tiers {
                    let Some(value) = field(snapshot) else {
                        continue;
                    };
                    if !header_written {
                        Self::write_header(&mut writer, &name, kind);
                        header_written = true;
                    }
                    Self::write_sample(
                        &mut writer,
                        &name,
                        &[("cache", cache.alias.as_str()), ("tier", tier.as_str())],
                        value,
                    );
                }
            }
        }
    }
}
