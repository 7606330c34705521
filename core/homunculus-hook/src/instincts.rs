//! `homunculus instincts …`

use crate::Context;
use clap::Subcommand;
use homunculus_core::instincts;
use homunculus_core::ObservationRecorder;

#[derive(Subcommand)]
pub enum InstinctsCommand {
    /// Personal and inherited instincts grouped by domain
    Status,

    /// Cluster instincts into skill candidates
    Evolve,
}

pub fn run(ctx: &Context, command: InstinctsCommand) -> Result<(), String> {
    let personal_dir = ctx.storage.personal_instincts_dir();
    let inherited_dir = ctx.storage.inherited_instincts_dir();
    let all = instincts::load_all(&personal_dir, &inherited_dir);

    match command {
        InstinctsCommand::Status => {
            let recorder = ObservationRecorder::new(&ctx.storage);
            let observations = recorder
                .log_file()
                .exists()
                .then(|| (recorder.pending_count(), recorder.log_file()));
            print!(
                "{}",
                instincts::status_report(&all, &personal_dir, &inherited_dir, observations)
            );
        }
        InstinctsCommand::Evolve => match instincts::evolve_report(&all) {
            Some(report) => print!("{}", report),
            None => println!(
                "Need at least 3 instincts to analyze patterns (have {}).",
                all.len()
            ),
        },
    }
    Ok(())
}
