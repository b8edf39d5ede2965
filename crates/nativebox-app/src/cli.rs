// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line arguments and their translation into a request.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use nativebox_client::{ButtonSpec, Icon, MessageBoxRequest, Result};

#[derive(Debug, Parser)]
#[command(name = "nativebox")]
#[command(bin_name = "nativebox")]
#[command(about = "Show a native message box and print the result as JSON", long_about = None)]
pub struct Cli {
    #[arg(short, long)]
    pub message: String,

    #[arg(short, long)]
    pub title: Option<String>,

    /// Button as ID=LABEL. Repeat for more buttons; an OK button is used
    /// when none is given.
    #[arg(short, long = "button", value_name = "ID=LABEL", value_parser = parse_button)]
    pub buttons: Vec<(u32, String)>,

    /// Id of the default button.
    #[arg(long, value_name = "ID")]
    pub default: Option<u32>,

    /// Id of the button Escape maps to.
    #[arg(long, value_name = "ID")]
    pub cancel: Option<u32>,

    #[arg(long, value_enum, default_value_t = IconArg::None)]
    pub icon: IconArg,

    /// Dismiss automatically after this many milliseconds.
    #[arg(long, value_name = "N")]
    pub timeout_ms: Option<u64>,

    #[arg(long, value_name = "ID")]
    pub timeout_button: Option<u32>,

    /// Label of a "don't show again" style checkbox.
    #[arg(long, value_name = "TEXT")]
    pub verification: Option<String>,

    /// Extra directory to search for the native library.
    #[arg(long, value_name = "DIR")]
    pub native_path: Vec<PathBuf>,

    /// Host options JSON file.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Show through the async path on a worker thread.
    #[arg(long = "async")]
    pub run_async: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IconArg {
    None,
    Information,
    Warning,
    Error,
    Question,
    Shield,
}

impl From<IconArg> for Icon {
    fn from(icon: IconArg) -> Self {
        match icon {
            IconArg::None => Icon::None,
            IconArg::Information => Icon::Information,
            IconArg::Warning => Icon::Warning,
            IconArg::Error => Icon::Error,
            IconArg::Question => Icon::Question,
            IconArg::Shield => Icon::Shield,
        }
    }
}

fn parse_button(value: &str) -> std::result::Result<(u32, String), String> {
    let (id, label) = value
        .split_once('=')
        .ok_or_else(|| format!("expected ID=LABEL, got {value:?}"))?;
    let id = id
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid button id {id:?}: {e}"))?;
    Ok((id, label.to_owned()))
}

impl Cli {
    pub fn to_request(&self) -> Result<MessageBoxRequest> {
        let mut builder = MessageBoxRequest::builder(self.message.clone()).icon(self.icon.into());
        if let Some(title) = &self.title {
            builder = builder.title(title.clone());
        }
        for (id, label) in &self.buttons {
            let mut button = ButtonSpec::new(*id, label.clone())?;
            if self.default == Some(*id) {
                button = button.as_default();
            }
            if self.cancel == Some(*id) {
                button = button.as_cancel();
            }
            builder = builder.button(button);
        }
        if let Some(ms) = self.timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        if let Some(id) = self.timeout_button {
            builder = builder.timeout_button(id);
        }
        if let Some(text) = &self.verification {
            builder = builder.verification_text(text.clone());
        }
        builder.build()
    }
}
