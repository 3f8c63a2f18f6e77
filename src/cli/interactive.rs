// Interactive signal panel

use super::output;
use crate::config::PanelConfig;
use crate::error::Result;
use crate::process::{current_uid, ProcessEntry, ProcessFilter, ProcessLister, SignalAction};
use crate::settings::JsonSettingsStore;
use crate::state::{last_selection, last_signal, PreviousSelections};
use dialoguer::{theme::ColorfulTheme, Confirm, FuzzySelect, Select};
use std::io::IsTerminal;

/// Show the process list, then pick a process and a signal and send it.
/// Without a terminal on stdin only the list is printed.
pub fn run(config: &PanelConfig, store: &mut JsonSettingsStore) -> Result<()> {
    let previous = PreviousSelections::load(&*store);
    let filter = ProcessFilter::new("", current_uid())
        .with_extra_ignored(config.signals.ignored_processes.clone());
    let entries = ProcessLister::new().list(&filter, &previous);

    if !std::io::stdin().is_terminal() {
        output::print_process_table(&entries);
        return Ok(());
    }

    if entries.is_empty() {
        output::print_info("No processes to signal");
        return Ok(());
    }

    let theme = ColorfulTheme::default();

    let labels: Vec<String> = entries.iter().map(ProcessEntry::label).collect();
    let Some(index) = FuzzySelect::with_theme(&theme)
        .with_prompt("Process")
        .items(&labels)
        .default(default_process_index(&entries, &last_selection(&*store)))
        .interact_opt()?
    else {
        return Ok(());
    };
    let name = entries[index].name.clone();

    let fallback = config
        .signals
        .default_signal
        .parse()
        .unwrap_or(SignalAction::Toggle);
    let Some(chosen) = Select::with_theme(&theme)
        .with_prompt("Signal")
        .items(&SignalAction::ALL)
        .default(signal_index(last_signal(&*store, fallback)))
        .interact_opt()?
    else {
        return Ok(());
    };
    let signal = SignalAction::ALL[chosen];

    if signal.is_forceful()
        && !Confirm::with_theme(&theme)
            .with_prompt(format!("Send {} to {}?", signal, name))
            .default(false)
            .interact()?
    {
        output::print_info("Cancelled");
        return Ok(());
    }

    let run = super::send_signal(config, store, signal, &[name])?;
    output::print_sig_result(&run);
    Ok(())
}

/// Row of the last selected name, or the first row
fn default_process_index(entries: &[ProcessEntry], last: &str) -> usize {
    entries.iter().position(|e| e.name == last).unwrap_or(0)
}

fn signal_index(signal: SignalAction) -> usize {
    SignalAction::ALL
        .iter()
        .position(|s| *s == signal)
        .unwrap_or(0)
}
