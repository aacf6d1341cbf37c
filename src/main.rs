//! emisnet-pdf – render a named report template to PDF.
//!
//! Usage:
//!   emisnet-pdf <template> [context.json] [output.pdf] [--templates DIR]
//!               [--assets DIR] [--config FILE] [--html]
//!   emisnet-pdf --sample <kind> [output.pdf]
//!   emisnet-pdf --list
//!
//! If `output.pdf` is omitted the PDF is written to `<template>.pdf` in the
//! current directory.

use std::{env, fs, path::PathBuf, process};

use chrono::Local;

use emisnet_pdf::config::Settings;
use emisnet_pdf::context::Context;
use emisnet_pdf::samples::SampleKind;
use emisnet_pdf::service::ReportGenerator;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let mut positional: Vec<String> = Vec::new();
    let mut templates_dir: Option<PathBuf> = None;
    let mut assets_dir: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut sample: Option<SampleKind> = None;
    let mut emit_html = false;
    let mut list = false;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--templates" => templates_dir = Some(PathBuf::from(flag_value(&mut iter, arg, &args[0]))),
            "--assets" => assets_dir = Some(PathBuf::from(flag_value(&mut iter, arg, &args[0]))),
            "--config" | "-c" => config_path = Some(PathBuf::from(flag_value(&mut iter, arg, &args[0]))),
            "--sample" | "-s" => match flag_value(&mut iter, arg, &args[0]).parse() {
                Ok(kind) => sample = Some(kind),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            },
            "--html" => emit_html = true,
            "--list" => list = true,
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown flag: {other}");
                print_usage(&args[0]);
                process::exit(1);
            }
            value => positional.push(value.to_string()),
        }
    }

    let mut settings = match &config_path {
        Some(path) => match Settings::from_json_file(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        },
        None => Settings::default(),
    };
    if templates_dir.is_some() {
        settings.templates_dir = templates_dir;
    }
    if let Some(dir) = assets_dir {
        settings.assets_dir = dir;
    }

    let generator = match ReportGenerator::from_settings(&settings) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    if list {
        for name in generator.engine().template_names() {
            println!("{name}");
        }
        return;
    }

    // Resolve template, context and output path.
    let (template, context, output) = if let Some(kind) = sample {
        if positional.len() > 1 {
            eprintln!("Unexpected argument: {}", positional[1]);
            print_usage(&args[0]);
            process::exit(1);
        }
        let context = match kind.context(generator.empresa(), Local::now().date_naive()) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error building sample '{kind}': {e}");
                process::exit(1);
            }
        };
        (kind.template().to_string(), context, positional.first().map(PathBuf::from))
    } else {
        let mut positional = positional.into_iter();
        let template = match positional.next() {
            Some(t) => t,
            None => {
                eprintln!("Error: no template specified.");
                print_usage(&args[0]);
                process::exit(1);
            }
        };
        let context = match positional.next() {
            Some(path) => match fs::read_to_string(&path) {
                Ok(json) => match Context::from_json(&json) {
                    Ok(c) => c,
                    Err(e) => {
                        eprintln!("Error in '{path}': {e}");
                        process::exit(1);
                    }
                },
                Err(e) => {
                    eprintln!("Error reading '{path}': {e}");
                    process::exit(1);
                }
            },
            None => Context::new(),
        };
        let output = positional.next().map(PathBuf::from);
        if let Some(extra) = positional.next() {
            eprintln!("Unexpected argument: {extra}");
            print_usage(&args[0]);
            process::exit(1);
        }
        (template, context, output)
    };

    if emit_html {
        match generator.render_html(&template, &context) {
            Ok(html) => print!("{html}"),
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
        return;
    }

    // Default output: template's last path segment with .pdf
    let output = output.unwrap_or_else(|| {
        let stem = template.rsplit('/').next().unwrap_or(&template);
        PathBuf::from(format!("{stem}.pdf"))
    });

    match generator.render_to_file(&template, &context, &output) {
        Ok(written) => {
            eprintln!("Wrote '{}' ({written} bytes)", output.display());
        }
        Err(e) => {
            eprintln!("Error generating PDF: {e}");
            process::exit(1);
        }
    }
}

fn flag_value<'a>(iter: &mut impl Iterator<Item = &'a String>, flag: &str, prog: &str) -> &'a str {
    match iter.next() {
        Some(v) => v,
        None => {
            eprintln!("Missing value for {flag}");
            print_usage(prog);
            process::exit(1);
        }
    }
}

fn print_usage(prog: &str) {
    eprintln!("emisnet-pdf – report templates to PDF");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {prog} <template> [context.json] [output.pdf] [flags]");
    eprintln!("  {prog} --sample <kind> [output.pdf] [flags]");
    eprintln!("  {prog} --list");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <template>      Logical template name, e.g. reporte-ventas");
    eprintln!("  [context.json]  JSON object whose members become template variables");
    eprintln!("  [output.pdf]    Output path (default: <template>.pdf)");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --sample, -s    Render built-in demo data: ventas, posiciones, confirmacion, aviso, prueba");
    eprintln!("  --templates     Directory of .html templates layered over the built-in ones");
    eprintln!("  --assets        Base directory for relative stylesheet and image references");
    eprintln!("  --config, -c    JSON settings file");
    eprintln!("  --html          Print the bound HTML instead of writing a PDF");
    eprintln!("  --list          List available templates");
    eprintln!("  --help          Print this message");
}
