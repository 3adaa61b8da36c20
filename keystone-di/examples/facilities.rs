//! Builds a small object graph with discovery, decoration and a fallback
//! container.
//!
//! Run with `RUST_LOG`-style output enabled through `tracing-subscriber`.

use anyhow::Result;
use keystone_di::prelude::*;
use std::sync::Arc;

trait Facility: Send + Sync {
    fn facilitate(&self) -> usize;
}

struct BasicFacility;

impl Facility for BasicFacility {
    fn facilitate(&self) -> usize {
        1
    }
}

struct AdvancedFacility {
    inner: Arc<dyn Facility>,
}

impl Facility for AdvancedFacility {
    fn facilitate(&self) -> usize {
        self.inner.facilitate() + 1
    }
}

struct Report {
    facility: Arc<dyn Facility>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .init();

    let mut catalog = TypeCatalog::builder();
    catalog
        .register_in(
            "facilities",
            Implementation::of::<AdvancedFacility>()
                .provides::<dyn Facility>(|it| it)
                .constructor(|inner: Arc<dyn Facility>| AdvancedFacility { inner })
                .build(),
        )
        .register_in(
            "facilities",
            Implementation::of::<BasicFacility>()
                .provides::<dyn Facility>(|it| it)
                .constructor(|| BasicFacility)
                .build(),
        )
        .register(
            Implementation::of::<Report>()
                .constructor(|facility: Arc<dyn Facility>| Report { facility })
                .transient()
                .build(),
        );
    let catalog = Arc::new(catalog.build());

    let mut shared = Container::with_catalog(catalog.clone());
    shared
        .refer_module("facilities")
        .decorate::<dyn Facility, AdvancedFacility>()?
        .decorate::<dyn Facility, AdvancedFacility>()?;
    let shared = Arc::new(shared);

    let mut local = Container::with_catalog(catalog);
    local.add::<Report, Report>()?.defer(shared.clone());

    let report = local.get::<Report>()?;
    println!("facilitate() = {}", report.facility.facilitate());

    match local.get::<String>() {
        Ok(_) => println!("unexpected String registration"),
        Err(err) => println!("{}", err),
    }

    Ok(())
}
