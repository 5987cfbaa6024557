//! Tracing subscriber setup.
//!
//! Two JSON layers share one registry: audit events (target
//! [`AUDIT_TARGET`]) go to the audit writer, everything else goes to the
//! operational writer. The binary wires these to stdout and stderr.

use tracing::Subscriber;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::{ParseError, Targets};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::webhooks::AUDIT_TARGET;

/// Add the crate default level to `base` and keep audit events out of it
pub fn operational_filter(base: EnvFilter) -> Result<EnvFilter, ParseError> {
    Ok(base
        .add_directive("vuln_admission_webhook=info".parse()?)
        .add_directive(format!("{}=off", AUDIT_TARGET).parse()?))
}

/// Build the audit/operational subscriber over the given writers
pub fn subscriber<A, O>(
    audit: A,
    operational: O,
    filter: EnvFilter,
) -> impl Subscriber + Send + Sync + 'static
where
    A: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    O: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let audit_layer = fmt::layer()
        .json()
        .with_writer(audit)
        .with_filter(Targets::new().with_target(AUDIT_TARGET, LevelFilter::INFO));

    let operational_layer = fmt::layer()
        .json()
        .with_writer(operational)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(audit_layer)
        .with(operational_layer)
}

/// Install the process-wide subscriber: audit on stdout, the rest on stderr
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    let filter = operational_filter(EnvFilter::from_default_env())?;
    subscriber(std::io::stdout, std::io::stderr, filter).try_init()?;
    Ok(())
}
