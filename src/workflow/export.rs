//! Export and reset: the two commands that act on a stored state without
//! generating anything.
use super::context::SessionContext;
use crate::cli::{ExportArgs, ResetArgs};
use crate::document;
use crate::session::{self, append_history, HistoryEntry, Session};
use crate::util::{display_path, now_epoch_ms};
use anyhow::Result;

pub fn run_export(args: &ExportArgs) -> Result<()> {
    let started = now_epoch_ms();
    let ctx = SessionContext::load(&args.session)?;
    let session = Session::load(ctx.paths.clone())?;
    let state = session.state();

    let doc = match document::assemble(state.params(), state.funnel_stage(), state.results()) {
        Ok(doc) => doc,
        Err(err) => {
            let entry = HistoryEntry::for_state("export", started, state, Err(err.to_string()));
            append_history(session.paths(), &entry)?;
            return Err(anyhow::Error::new(err).context("export needs a complete pipeline"));
        }
    };

    if args.stdout {
        print!("{doc}");
    } else {
        let path = args.out.clone().unwrap_or_else(|| {
            ctx.paths
                .out_dir()
                .join(document::export_file_name(state.params()))
        });
        session::write_atomic(&path, doc.as_bytes())?;
        println!("wrote {}", display_path(&path, Some(ctx.paths.root())));
    }
    append_history(
        session.paths(),
        &HistoryEntry::for_state("export", started, state, Ok(())),
    )?;
    Ok(())
}

pub fn run_reset(args: &ResetArgs) -> Result<()> {
    let started = now_epoch_ms();
    let ctx = SessionContext::load(&args.session)?;
    let mut session = Session::load(ctx.paths.clone())?;
    let discarded = session.state().completed_stages().len();
    session.reset();
    session.save()?;
    append_history(
        session.paths(),
        &HistoryEntry::for_state("reset", started, session.state(), Ok(())),
    )?;
    println!("discarded {discarded} stage result(s); parameters kept");
    Ok(())
}
