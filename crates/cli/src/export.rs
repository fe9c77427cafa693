// fedlink export: chunked dataset export to CSV

use std::path::PathBuf;

use fedlink_client::{default_output_path, ExportOptions, OffsetMode};

use crate::{print_json, print_line, CliError, Context};

pub fn cmd_export(
    ctx: &Context,
    metano: &str,
    out: Option<PathBuf>,
    page_size: Option<u32>,
    offset_mode: OffsetMode,
) -> Result<(), CliError> {
    let metano = metano.trim();
    if metano.is_empty() {
        return Err(CliError::args("dataset identifier is empty"));
    }

    let page_size = page_size.unwrap_or(ctx.profile.export_page_size.value);
    if page_size == 0 {
        return Err(CliError::args("--page-size must be at least 1"));
    }

    let output = out.unwrap_or_else(|| default_output_path(metano));
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.is_dir() {
            return Err(CliError::io(format!(
                "output directory does not exist: {}",
                parent.display()
            )));
        }
    }

    let client = ctx.client()?;
    let options = ExportOptions {
        output: Some(output.clone()),
        page_size,
        offset_mode,
    };

    ctx.note(format!("exporting {} to {}", metano, output.display()));
    let summary = client.export_csv(metano, &options).map_err(|e| {
        // The partial file is kept; say where it is
        CliError::platform(e).with_hint(format!("partial output left at {}", output.display()))
    })?;

    if ctx.json {
        return print_json(&summary);
    }
    print_line(format!(
        "exported {} rows to {} ({} pages, largest page {} rows)",
        summary.row_count, summary.filename, summary.pages, summary.peak_page_rows
    ))
}
