//! Readers command - list PC/SC readers

use anyhow::Result;

use crate::output::OutputContext;

/// List the PC/SC readers attached to this host
#[cfg(feature = "pcsc")]
pub fn readers(ctx: &OutputContext) -> Result<()> {
    use anyhow::Context;

    use crate::output::ReaderRow;

    let names = cardlink_terminal::reader::pcsc::list_readers()
        .context("Failed to list PC/SC readers")?;

    if names.is_empty() {
        ctx.info("No readers found");
        return Ok(());
    }

    let rows: Vec<ReaderRow> = names
        .into_iter()
        .enumerate()
        .map(|(index, name)| ReaderRow { index, name })
        .collect();

    ctx.print(&rows);
    Ok(())
}

#[cfg(not(feature = "pcsc"))]
pub fn readers(_ctx: &OutputContext) -> Result<()> {
    anyhow::bail!("cardlink was built without PC/SC support; rebuild with --features pcsc")
}
