use serde::Serialize;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use survey_client::client::config::{app_data_root, ClientConfig};
use survey_client::client::token::TokenStore;
use survey_client::client::types::LoginCredentials;
use survey_client::commands::analytics::load_analytics_view;
use survey_client::commands::dashboard::{export_survey, refresh_surveys, ExportArgs};
use survey_client::commands::respond::{submit_answers, SubmitArgs, SubmitError};
use survey_client::commands::session::{restore_session, sign_in, sign_out};
use survey_client::error::ApiError;
use survey_client::state::{AppState, LivenessGuard};
use survey_client::survey::codec::FormErrors;
use survey_client::survey::types::SurveyId;

const USAGE: &str = "usage: survey-client <command>

commands:
  login <username> <password>   sign in and keep the token
  logout                        forget the stored token
  whoami                        show the signed-in profile
  list                          list your surveys
  survey <id>                   show one survey
  respond <id> <answers-json>   submit answers keyed by question id
  analytics <id>                show the analytics view model
  export <id> [dir]             download responses as CSV";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = env::args().skip(1).collect::<Vec<String>>();
    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &[String]) -> Result<(), String> {
    let Some(command) = args.first().map(String::as_str) else {
        return Err(USAGE.to_string());
    };

    let config = ClientConfig::load()?;
    let tokens = TokenStore::persistent(&config.token_file).map_err(|e| e.to_string())?;
    let mut state = AppState::new(&config, tokens).map_err(report)?;
    info!(api = %config.base_url(), command, "starting");

    match command {
        "login" => {
            let (Some(username), Some(password)) = (args.get(1), args.get(2)) else {
                return Err(USAGE.to_string());
            };
            let credentials = LoginCredentials {
                username: username.clone(),
                password: password.clone(),
            };
            let user = sign_in(&mut state, &credentials).await.map_err(report)?;
            print_json(&user)
        }
        "logout" => {
            sign_out(&mut state);
            println!("signed out");
            Ok(())
        }
        "whoami" => match restore_session(&mut state).await.map_err(report)? {
            Some(user) => print_json(&user),
            None => Err("not signed in".to_string()),
        },
        "list" => {
            refresh_surveys(&mut state).await;
            if let Some(message) = state.list.error() {
                return Err(message.to_string());
            }
            print_json(&state.list.surveys())
        }
        "survey" => {
            let survey_id = survey_id_arg(args)?;
            let survey = state.surveys.get_survey(survey_id).await.map_err(report)?;
            print_json(&survey)
        }
        "respond" => {
            let survey_id = survey_id_arg(args)?;
            let raw = args.get(2).ok_or_else(|| USAGE.to_string())?;
            let answers = serde_json::from_str(raw).map_err(|e| format!("answers: {e}"))?;
            let submit = SubmitArgs {
                survey_id,
                answers,
            };
            match submit_answers(&state.surveys, submit).await {
                Ok(stored) => print_json(&stored),
                Err(SubmitError::Form(errors)) => Err(form_report(&errors)),
                Err(SubmitError::Api(e)) => Err(report(e)),
            }
        }
        "analytics" => {
            let survey_id = survey_id_arg(args)?;
            let guard = LivenessGuard::new();
            match load_analytics_view(&state.surveys, &guard, survey_id)
                .await
                .map_err(report)?
            {
                Some(view) => print_json(&view),
                None => Err("analytics request was superseded".to_string()),
            }
        }
        "export" => {
            let survey_id = survey_id_arg(args)?;
            let output_dir = match args.get(2) {
                Some(dir) => PathBuf::from(dir),
                None => default_export_dir(&config)?,
            };
            let exported = export_survey(
                &mut state,
                ExportArgs {
                    survey_id,
                    output_dir,
                },
            )
            .await
            .map_err(report)?;
            print_json(&exported)
        }
        other => Err(format!("unknown command '{other}'\n\n{USAGE}")),
    }
}

fn survey_id_arg(args: &[String]) -> Result<SurveyId, String> {
    let raw = args.get(1).ok_or_else(|| USAGE.to_string())?;
    raw.parse::<SurveyId>()
        .map_err(|_| format!("'{raw}' is not a survey id"))
}

fn default_export_dir(config: &ClientConfig) -> Result<PathBuf, String> {
    match &config.export_dir {
        Some(dir) if !dir.trim().is_empty() => Ok(PathBuf::from(dir)),
        _ => Ok(app_data_root()?.join("exports")),
    }
}

fn form_report(errors: &FormErrors) -> String {
    let mut lines = vec![errors.to_string()];
    for (question_id, err) in &errors.errors {
        lines.push(format!("  question {question_id}: {err}"));
    }
    for question_id in &errors.unknown_questions {
        lines.push(format!("  question {question_id}: not part of this survey"));
    }
    lines.join("\n")
}

fn report(err: ApiError) -> String {
    error!("{err}");
    err.user_message()
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), String> {
    let payload = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{payload}");
    Ok(())
}
