use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    anyhow::Result,
    clap::Subcommand,
    ragkit_config::{Calibration, Profile, ProfileAnswers},
    ragkit_onboarding::{
        FileProgressStore, FsScanner, SourceScan, WizardController,
        store::PROGRESS_FILENAME,
        wizard::{parse_patch, run_onboarding},
    },
    ragkit_service_traits::Services,
};

#[derive(Subcommand)]
pub enum WizardAction {
    /// Show the current step and search strategy.
    Status {
        /// Print the whole draft config as JSON.
        #[arg(long)]
        config: bool,
    },
    /// Interactive wizard in the terminal.
    Run,
    /// Go to the next step.
    Next,
    /// Go to the previous step.
    Back,
    /// Shallow-merge a JSON object into a branch (e.g. `retrieval.hybrid`).
    Set { branch: String, patch: String },
    /// Seed the config from a document profile.
    Profile {
        /// technical_documentation, faq_support, legal_compliance,
        /// reports_analysis or general.
        profile: String,
        /// Calibration questions answered "yes" (e.g. `q1,q3`).
        #[arg(long, value_delimiter = ',')]
        calibration: Vec<String>,
    },
    /// Set the documents folder (clears excluded subfolders).
    Source { path: String },
    /// Exclude a subfolder from ingestion, or include it again.
    Exclude { path: String },
    /// Scan the documents folder and show totals after exclusions.
    Scan,
    /// Finalize the draft config as the live settings.
    Complete,
}

pub async fn handle_wizard(
    action: WizardAction,
    data_dir: &Path,
    settings_file: Option<PathBuf>,
) -> Result<()> {
    let store = match settings_file {
        Some(settings) => FileProgressStore::new(data_dir.join(PROGRESS_FILENAME), settings),
        None => FileProgressStore::in_dir(data_dir),
    };
    let mut wizard = WizardController::with_services(Services {
        progress: Arc::new(store),
        scanner: Arc::new(FsScanner),
    })
    .await?;

    match action {
        WizardAction::Status { config } => {
            print_status(&wizard);
            if config {
                println!("{}", serde_json::to_string_pretty(wizard.config())?);
            }
        },
        WizardAction::Run => {
            if run_onboarding(&mut wizard).await? {
                eprintln!("Settings saved.");
            } else {
                eprintln!("Progress saved; run `ragkit wizard run` to continue.");
            }
        },
        WizardAction::Next => {
            wizard.advance().await?;
            print_status(&wizard);
        },
        WizardAction::Back => {
            wizard.retreat().await?;
            print_status(&wizard);
        },
        WizardAction::Set { branch, patch } => {
            wizard.update_config(&branch, &parse_patch(&patch)?).await?;
            print_status(&wizard);
        },
        WizardAction::Profile {
            profile,
            calibration,
        } => {
            let answers = ProfileAnswers {
                profile: profile.parse::<Profile>()?,
                calibration: Calibration::from_keys(calibration.iter().map(String::as_str)),
            };
            let seed = wizard.apply_profile(&answers).await?;
            for (key, value) in &seed.summary {
                println!("{key}: {value}");
            }
        },
        WizardAction::Source { path } => {
            wizard.select_source(&path).await?;
            println!("Source: {path}");
        },
        WizardAction::Exclude { path } => {
            if wizard.toggle_excluded_dir(&path).await? {
                println!("Excluded {path}");
            } else {
                println!("Included {path}");
            }
        },
        WizardAction::Scan => {
            let scan = wizard.scan_source().await?;
            print!("{}", scan_report(&scan));
        },
        WizardAction::Complete => {
            wizard.complete().await?;
            eprintln!("Setup complete.");
        },
    }
    Ok(())
}

fn print_status(wizard: &WizardController) {
    println!("{}", status_line(wizard));
}

fn scan_report(scan: &SourceScan) -> String {
    let mut out = format!(
        "{} files, {:.1} MB after exclusions\n",
        scan.stats.files,
        scan.stats.size_mb()
    );
    for info in &scan.file_types.supported_types {
        out.push_str(&format!("  {:<18} {:>6}\n", info.display_name, info.count));
    }
    for info in &scan.file_types.unsupported_types {
        out.push_str(&format!(
            "  {:<18} {:>6} (not supported)\n",
            format!(".{}", info.extension),
            info.count
        ));
    }
    out
}

fn status_line(wizard: &WizardController) -> String {
    let step = wizard.current_step();
    format!(
        "Step {}: {} ({})",
        step.position(),
        step.title(),
        wizard.search_type()
    )
}
