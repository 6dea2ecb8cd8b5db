//! Prometheus text exposition format.
//!
//! Runs one describe + collect cycle and renders the result in text format
//! 0.0.4 for scraping by a Prometheus server or compatible agent.

use std::fmt::Write;

use crate::collector::AppCollector;
use crate::schema::{MetricDesc, Sample};

/// Content type for the text exposition format.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// All samples of one descriptor, ready for encoding.
#[derive(Debug)]
pub struct MetricFamily<'a> {
    pub desc: &'a MetricDesc,
    pub samples: Vec<Sample<'a>>,
}

/// Describe + collect, grouped per descriptor in describe order.
///
/// Samples within a family are sorted by label values. Every described
/// family is present, even with no samples.
///
/// # Panics
///
/// If the collector yields a sample for a descriptor it did not describe.
pub fn gather(collector: &AppCollector) -> Vec<MetricFamily<'_>> {
    let mut families: Vec<MetricFamily<'_>> = collector
        .describe()
        .into_iter()
        .map(|desc| MetricFamily {
            desc,
            samples: Vec::new(),
        })
        .collect();

    for sample in collector.collect() {
        let Some(family) = families
            .iter_mut()
            .find(|f| f.desc.fq_name == sample.desc.fq_name)
        else {
            panic!("collected metric {} was not described", sample.desc.fq_name);
        };
        family.samples.push(sample);
    }

    for family in &mut families {
        family
            .samples
            .sort_by(|a, b| a.label_values.cmp(&b.label_values));
    }
    families
}

/// Render families into Prometheus text format.
///
/// Produces GAUGE families with `# HELP` and `# TYPE` headers.
pub fn encode_text(families: &[MetricFamily<'_>]) -> String {
    let mut out = String::new();

    for family in families {
        let desc = family.desc;
        let _ = writeln!(out, "# HELP {} {}", desc.fq_name, escape_help(desc.help));
        let _ = writeln!(out, "# TYPE {} gauge", desc.fq_name);

        for sample in &family.samples {
            out.push_str(&desc.fq_name);
            if !desc.label_names.is_empty() {
                out.push('{');
                let pairs = desc.label_names.iter().zip(&sample.label_values);
                for (i, (name, value)) in pairs.enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    let _ = write!(out, "{name}=\"{}\"", escape_label_value(value));
                }
                out.push('}');
            }
            let _ = writeln!(out, " {}", format_value(sample.value));
        }
    }

    out
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Integral values print without a fractional part.
fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "+Inf".to_string()
    } else if v == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use appstat_state::*;
    use chrono::{TimeZone, Utc};

    use crate::schema::MetricSchema;

    struct StaticStore(StateResult<Vec<Application>>);

    impl ApplicationLister for StaticStore {
        fn list(&self, _selector: &LabelSelector) -> StateResult<Vec<Application>> {
            match &self.0 {
                Ok(apps) => Ok(apps.clone()),
                Err(e) => Err(StateError::Unavailable(e.to_string())),
            }
        }
    }

    fn app(ns: &str, name: &str) -> Application {
        let mut app = Application::default();
        app.metadata.namespace = ns.to_string();
        app.metadata.name = name.to_string();
        app.metadata.creation_timestamp = Utc.timestamp_opt(1_600_000_000, 0).unwrap();
        app.spec.project = "default".to_string();
        app.spec.source.repo_url = "https://example/repo.git".to_string();
        app.spec.destination.server = "https://cluster1".to_string();
        app.spec.destination.namespace = ns.to_string();
        app.status.sync.status = "Synced".to_string();
        app.status.health.status = "Healthy".to_string();
        app
    }

    fn render(store: StaticStore) -> String {
        let collector = AppCollector::new(Arc::new(MetricSchema::default()), Arc::new(store));
        encode_text(&gather(&collector))
    }

    #[test]
    fn render_empty_still_has_headers() {
        let output = render(StaticStore(Ok(Vec::new())));
        for name in ["app_info", "app_created_time", "app_sync_status", "app_health_status"] {
            assert!(output.contains(&format!("# HELP argocd_{name} ")));
            assert!(output.contains(&format!("# TYPE argocd_{name} gauge")));
        }
        assert_eq!(output.lines().filter(|l| !l.starts_with('#')).count(), 0);
    }

    #[test]
    fn render_list_failure_matches_empty_store() {
        let failed = render(StaticStore(Err(StateError::Read("boom".into()))));
        let empty = render(StaticStore(Ok(Vec::new())));
        assert_eq!(failed, empty);
    }

    #[test]
    fn render_single_application() {
        let output = render(StaticStore(Ok(vec![app("team-a", "app1")])));

        assert!(output.contains(
            "argocd_app_info{namespace=\"team-a\",name=\"app1\",project=\"default\",\
             repo=\"https://example/repo.git\",dest_server=\"https://cluster1\",\
             dest_namespace=\"team-a\"} 1\n"
        ));
        assert!(output.contains(
            "argocd_app_created_time{namespace=\"team-a\",name=\"app1\"} 1600000000\n"
        ));
        assert!(output.contains(
            "argocd_app_sync_status{namespace=\"team-a\",name=\"app1\",sync_status=\"Synced\"} 1\n"
        ));
        assert!(output.contains(
            "argocd_app_sync_status{namespace=\"team-a\",name=\"app1\",sync_status=\"OutOfSync\"} 0\n"
        ));
        assert!(output.contains(
            "argocd_app_health_status{namespace=\"team-a\",name=\"app1\",health_status=\"Missing\"} 0\n"
        ));
        assert_eq!(output.lines().filter(|l| !l.starts_with('#')).count(), 10);
    }

    #[test]
    fn families_are_contiguous_and_sorted() {
        let output = render(StaticStore(Ok(vec![app("ns2", "b"), app("ns1", "a")])));

        let names: Vec<&str> = output
            .lines()
            .filter(|l| !l.starts_with('#'))
            .map(|l| l.split('{').next().unwrap())
            .collect();
        let mut deduped = names.clone();
        deduped.dedup();
        assert_eq!(deduped.len(), 4, "each family appears as one block");

        let created: Vec<&str> = output
            .lines()
            .filter(|l| l.starts_with("argocd_app_created_time{"))
            .collect();
        assert!(created[0].contains("namespace=\"ns1\""));
        assert!(created[1].contains("namespace=\"ns2\""));
    }

    #[test]
    fn label_values_are_escaped() {
        let mut a = app("ns", "weird");
        a.spec.project = "quote\"back\\slash\nnewline".to_string();
        let output = render(StaticStore(Ok(vec![a])));
        assert!(output.contains("project=\"quote\\\"back\\\\slash\\nnewline\""));
    }

    #[test]
    fn value_formatting() {
        assert_eq!(format_value(1.0), "1");
        assert_eq!(format_value(0.0), "0");
        assert_eq!(format_value(1_600_000_000.0), "1600000000");
        assert_eq!(format_value(-5.0), "-5");
        assert_eq!(format_value(0.25), "0.25");
        assert_eq!(format_value(f64::INFINITY), "+Inf");
        assert_eq!(format_value(f64::NAN), "NaN");
    }

    #[test]
    fn format_is_prometheus_compatible() {
        let output = render(StaticStore(Ok(vec![app("test", "x")])));

        // Every non-comment line should match: metric_name{labels} value
        for line in output.lines() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            assert!(
                line.contains('{') && line.contains("} "),
                "line should have labels: {line}"
            );
        }
    }
}
