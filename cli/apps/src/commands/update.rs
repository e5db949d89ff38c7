//! `workload update` (deprecated in favour of `apply`)

use crate::commands::options::{self, WorkloadOptions};
use crate::commands::CommandContext;
use crate::error::CliError;
use clap::Args;
use crds::Workload;

/// Update configuration of an existing workload.
#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub options: WorkloadOptions,
}

/// Run the update command.
pub async fn run(args: UpdateArgs, ctx: &mut CommandContext) -> Result<(), CliError> {
    let opts = &args.options;
    opts.validate().into_result()?;
    if opts.dry_run {
        ctx.printer = ctx.printer.clone().with_info_to_stderr();
    }

    ctx.printer.info(format!(
        "WARNING: the update command has been deprecated and will be removed in a future update. Please use \"{} workload apply\" instead.",
        ctx.config.name
    ));
    ctx.printer.info("");

    let mut from_file = opts.load_input_workload(ctx)?;
    opts.apply_identity(ctx, &mut from_file);

    let current = fetch_existing(ctx, &from_file).await?;
    options::submit_update(opts, ctx, current, &from_file).await
}

async fn fetch_existing(ctx: &CommandContext, workload: &Workload) -> Result<Workload, CliError> {
    let namespace = workload.namespace_or_empty();
    let name = workload.name_or_empty();
    match ctx.client.get_workload(namespace, name).await {
        Ok(current) => Ok(current),
        Err(e) if e.is_not_found() => {
            options::validate_namespace(ctx, namespace).await?;
            ctx.printer.error(format!("Workload \"{namespace}/{name}\" not found"));
            Err(CliError::silent(e))
        }
        Err(e) => Err(e.into()),
    }
}
