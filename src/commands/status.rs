use crate::core::state::StateStore;
use anyhow::Result;
use std::path::Path;

pub fn show_status(state_path: &Path) -> Result<()> {
    let store = StateStore::new(state_path);
    let state = store.load()?;

    if state.is_empty() {
        println!("No builds recorded yet in {}", store.path().display());
        println!();
        println!("Run: uupwatch check <channel>");
        return Ok(());
    }

    println!("Recorded builds ({}):", store.path().display());
    for (channel, update_id) in &state {
        println!("  {channel:<12} {update_id}");
    }

    Ok(())
}
