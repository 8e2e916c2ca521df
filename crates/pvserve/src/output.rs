use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

use crate::wire::ValueBody;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

pub fn print_value(body: &ValueBody, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["NAME", "KIND", "VALUES", "SEVR", "STAT", "TIMESTAMP"])
                .add_row(vec![
                    body.name.clone(),
                    body.kind.clone(),
                    values_preview(&body.values),
                    body.severity.to_string(),
                    body.status.to_string(),
                    format!("{}.{:09}", body.timestamp_secs, body.timestamp_nanos),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            print!(
                "{} ({}) = {} sevr={} stat={}",
                body.name,
                body.kind,
                values_preview(&body.values),
                body.severity,
                body.status
            );
            if let Some(high) = body.high_limit {
                print!(" high={high}");
            }
            if let Some(low) = body.low_limit {
                print!(" low={low}");
            }
            println!();
        }
    }
}

pub fn print_event(mask: u8, body: &ValueBody, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let line = serde_json::json!({ "event": mask, "value": body });
            println!("{line}");
        }
        _ => {
            println!(
                "event mask={} {} = {}",
                mask,
                body.name,
                values_preview(&body.values)
            );
        }
    }
}

fn values_preview(values: &[f64]) -> String {
    let rendered = values
        .iter()
        .map(|v| {
            if v.fract() == 0.0 && v.abs() < 1e15 {
                format!("{}", *v as i64)
            } else {
                v.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{rendered}]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_values_render_without_fraction() {
        assert_eq!(values_preview(&[1.0, -2.0, 3.5]), "[1, -2, 3.5]");
        assert_eq!(values_preview(&[]), "[]");
    }
}
