use anyhow::Result;

use clai_runtime::ImportResult;
use clai_types::RpcRequest;

use super::CliContext;

pub fn handle(ctx: &CliContext, shell: &str, path: Option<String>, force: bool) -> Result<()> {
    let result: ImportResult = ctx.client().call_expect(&RpcRequest::ImportHistory {
        shell: shell.to_string(),
        path,
        skip_if_imported: true,
        force,
    })?;

    if result.skipped {
        println!(
            "{} history already imported (use --force to re-import)",
            shell
        );
    } else {
        println!("imported {} commands from {} history", result.imported, shell);
    }
    Ok(())
}
