//! Application → sample mapping.
//!
//! Sync and health states are one-hot encoded over a fixed, ordered table
//! of buckets. The last bucket of each table is a catch-all that claims any
//! value no earlier bucket matched, so exactly one sample per table is 1
//! for every input, including empty or never-seen status strings.

use appstat_state::{Application, HealthStatusCode, SyncStatusCode};

use crate::schema::{MetricDesc, MetricSchema, Sample};

/// One categorical bucket, named by its label value.
#[derive(Debug, Clone, Copy)]
enum Bucket {
    /// Matches a status string equal to the label.
    Exact(&'static str),
    /// Matches when no earlier bucket did. Must come last.
    Otherwise(&'static str),
}

const SYNC_BUCKETS: [Bucket; 3] = [
    Bucket::Exact(SyncStatusCode::Synced.as_str()),
    Bucket::Exact(SyncStatusCode::OutOfSync.as_str()),
    Bucket::Otherwise(SyncStatusCode::Unknown.as_str()),
];

const HEALTH_BUCKETS: [Bucket; 5] = [
    Bucket::Exact(HealthStatusCode::Progressing.as_str()),
    Bucket::Exact(HealthStatusCode::Healthy.as_str()),
    Bucket::Exact(HealthStatusCode::Degraded.as_str()),
    Bucket::Exact(HealthStatusCode::Missing.as_str()),
    Bucket::Otherwise(HealthStatusCode::Unknown.as_str()),
];

/// Map one application to every sample it contributes to a scrape.
///
/// Always yields 1 info, 1 creation-time, 3 sync and 5 health samples.
pub fn map_application<'a>(schema: &'a MetricSchema, app: &Application) -> Vec<Sample<'a>> {
    let mut samples = Vec::with_capacity(2 + SYNC_BUCKETS.len() + HEALTH_BUCKETS.len());

    samples.push(Sample::new(
        &schema.app_info,
        app_labels(
            app,
            &[
                app.spec.project.as_str(),
                app.spec.source.repo_url.as_str(),
                app.spec.destination.server.as_str(),
                app.spec.destination.namespace.as_str(),
            ],
        ),
        1.0,
    ));

    samples.push(Sample::new(
        &schema.app_created_time,
        app_labels(app, &[]),
        app.created_unix() as f64,
    ));

    push_one_hot(
        &mut samples,
        &schema.app_sync_status,
        &SYNC_BUCKETS,
        app,
        &app.status.sync.status,
    );
    push_one_hot(
        &mut samples,
        &schema.app_health_status,
        &HEALTH_BUCKETS,
        app,
        &app.status.health.status,
    );

    samples
}

fn push_one_hot<'a>(
    out: &mut Vec<Sample<'a>>,
    desc: &'a MetricDesc,
    table: &[Bucket],
    app: &Application,
    observed: &str,
) {
    let mut matched = false;
    for bucket in table {
        let (label, hit) = match *bucket {
            Bucket::Exact(label) => (label, observed == label),
            Bucket::Otherwise(label) => (label, !matched),
        };
        matched |= hit;
        out.push(Sample::new(desc, app_labels(app, &[label]), bool_value(hit)));
    }
}

/// `namespace`, `name`, then the family-specific values.
fn app_labels(app: &Application, extra: &[&str]) -> Vec<String> {
    let mut values = Vec::with_capacity(2 + extra.len());
    values.push(app.metadata.namespace.clone());
    values.push(app.metadata.name.clone());
    values.extend(extra.iter().map(|v| v.to_string()));
    values
}

fn bool_value(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}
