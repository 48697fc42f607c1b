use crate::core::state::StateStore;
use crate::error::{Result, UupError};
use std::path::Path;

/// Marks `update_id` as the last processed build of `channel`, for example
/// after a package was built by hand.
pub fn record_build(state_path: &Path, channel: &str, update_id: &str) -> Result<()> {
    if channel.trim().is_empty() || update_id.trim().is_empty() {
        return Err(UupError::config_error(
            "channel and update ID must not be empty",
        ));
    }

    let store = StateStore::new(state_path);
    let previous = store.last_seen(channel)?;
    store.record(channel, update_id)?;

    match previous {
        Some(previous) if previous == update_id => {
            println!("✅ {channel} already at {update_id}")
        }
        Some(previous) => println!("✅ {channel}: {previous} -> {update_id}"),
        None => println!("✅ {channel}: {update_id}"),
    }
    Ok(())
}
