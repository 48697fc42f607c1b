use crate::core::config::Endpoints;
use crate::core::http::{HttpClient, ReqwestClient};
use crate::core::locator::{BuildRecord, LocateStrategy, UpdateLocator};
use crate::core::retry::RetryPolicy;
use crate::error::Result;
use std::rc::Rc;

/// Looks up the newest build on `channel` without touching any local state.
pub fn show_latest(
    channel: &str,
    arch: &str,
    strategy: LocateStrategy,
    endpoints: &Endpoints,
    retry: RetryPolicy,
) -> Result<BuildRecord> {
    let client: Rc<dyn HttpClient> = Rc::new(ReqwestClient::new()?);
    let locator = UpdateLocator::new(client, retry, strategy, endpoints.locate_url(strategy));
    latest_build(&locator, channel, arch)
}

pub fn latest_build(locator: &UpdateLocator, channel: &str, arch: &str) -> Result<BuildRecord> {
    let record = locator.locate(channel, arch)?;

    println!("Latest build on '{channel}' ({arch}):");
    println!("  Update ID: {}", record.update_id);
    match &record.build_number {
        Some(build) => println!("  Build:     {build}"),
        None => println!("  Build:     unknown"),
    }

    Ok(record)
}
