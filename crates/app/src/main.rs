use std::fmt;

use quiz_core::countdown::format_remaining;
use quiz_core::model::{
    AnswerId, AnswerOption, Lesson, LessonId, QUESTION_COUNT_CHOICES, QuestionId, QuestionRef,
    StudentId, Subject, SubjectId, Topic, TopicId,
};
use remote::{Backend, CatalogLevel, InMemoryBackend};
use services::{
    AttemptRunner, Clock, Direction, QuizConfig, QuizSession, SessionEvent, SessionPhase,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidNumber { flag: &'static str, raw: String },
    InvalidApiUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { flag, raw } => {
                write!(f, "invalid {flag} value: {raw} (expected a positive number)")
            }
            ArgsError::InvalidApiUrl { raw } => write!(f, "invalid --api value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn require_positive(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<u64, ArgsError> {
    let raw = require_value(args, flag)?;
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ArgsError::InvalidNumber { flag, raw }),
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- play [--api <url>] [--student-id <id>] [--minutes <n>] [--count <n>]");
    eprintln!("  cargo run -p app -- demo [--minutes <n>] [--count <n>]  # offline sample catalog");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --api https://localhost:7285/api");
    eprintln!("  --student-id 2  --minutes 5  --count 10");
    eprintln!();
    eprintln!("Environment (flags win):");
    eprintln!("  QUIZ_API_BASE_URL, QUIZ_STUDENT_ID, QUIZ_EXAM_MINUTES, QUIZ_QUESTION_COUNT,");
    eprintln!("  QUIZ_POINTS_PER_CORRECT, QUIZ_PASS_THRESHOLD, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play,
    Demo,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "play" => Some(Self::Play),
            "demo" => Some(Self::Demo),
            _ => None,
        }
    }
}

/// Apply command-line overrides on top of the environment configuration.
fn parse_overrides(
    mut config: QuizConfig,
    args: &mut impl Iterator<Item = String>,
) -> Result<QuizConfig, ArgsError> {
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--api" => {
                let value = require_value(args, "--api")?;
                if value.trim().is_empty() {
                    return Err(ArgsError::InvalidApiUrl { raw: value });
                }
                config.api_base_url = value.trim().to_owned();
            }
            "--student-id" => {
                config.student_id = StudentId::new(require_positive(args, "--student-id")?);
            }
            "--minutes" => {
                let minutes = require_positive(args, "--minutes")?;
                config.exam_minutes = u32::try_from(minutes).unwrap_or(u32::MAX);
            }
            "--count" => {
                let count = require_positive(args, "--count")?;
                config.question_count = u32::try_from(count).unwrap_or(u32::MAX);
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            _ => return Err(ArgsError::UnknownArg(arg)),
        }
    }
    Ok(config)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

//
// ─── DEMO CATALOG ─────────────────────────────────────────────────────────────
//

fn demo_backend() -> Backend {
    let repo = InMemoryBackend::new();
    let subject = SubjectId::new(1);
    let topic = TopicId::new(1);
    let lesson = LessonId::new(1);
    repo.add_subject(Subject::new(subject, "Mathematics"));
    repo.add_topic(subject, Topic::new(topic, "Arithmetic"));
    repo.add_lesson(topic, Lesson::new(lesson, "Multiplication"));

    for (id, (a, b)) in [(2u64, 3u64), (4, 5), (6, 7), (8, 9), (7, 12)]
        .into_iter()
        .enumerate()
    {
        let question = QuestionId::new(id as u64 + 1);
        repo.add_question(
            subject,
            topic,
            lesson,
            QuestionRef::new(question, format!("What is {a} × {b}?")),
        );
        let right = a * b;
        let options = [right, right + 1, right.saturating_sub(2), right + a]
            .into_iter()
            .enumerate()
            .map(|(n, value)| {
                AnswerOption::new(
                    AnswerId::new(question.value() * 10 + n as u64),
                    value.to_string(),
                    value == right,
                )
            })
            .collect();
        repo.set_answers(question, options);
    }
    Backend::in_memory(repo)
}

//
// ─── TERMINAL LOOP ────────────────────────────────────────────────────────────
//

/// Everything on screen except the clock, so ticks alone don't redraw.
fn screen(session: &QuizSession) -> String {
    let mut out = String::new();
    match session.phase() {
        SessionPhase::Configuring => {
            let selection = session.selection();
            let questions_loading = session.catalog().is_loading(CatalogLevel::Questions);
            let (title, items): (&str, Vec<&str>) = if selection.subject.is_none() {
                ("Subjects", names(session.subjects()))
            } else if selection.topic.is_none() {
                ("Topics", names(session.topics()))
            } else if selection.lesson.is_none() || !questions_loading {
                ("Lessons", names(session.lessons()))
            } else {
                ("Loading questions", Vec::new())
            };
            out.push_str(&format!(
                "{title} ({} questions per attempt; common choices {:?})\n",
                selection.count, QUESTION_COUNT_CHOICES
            ));
            for (n, name) in items.iter().enumerate() {
                out.push_str(&format!("  {}. {name}\n", n + 1));
            }
            if selection.lesson.is_some() && !questions_loading {
                out.push_str("No questions available for that lesson; pick another or `r` to retry.\n");
            }
            out.push_str("Pick a number, `count <n>` to change the question count, `back` to go up a level, `r` to reload, `q` to quit.\n");
        }
        SessionPhase::InProgress => {
            let (Some(question), Some(progress)) = (session.current_question(), session.progress())
            else {
                return out;
            };
            out.push_str(&format!(
                "Question {}/{} ({} answered)\n{}\n",
                progress.current_position, progress.total, progress.answered, question.text
            ));
            if session.answers_loading() {
                out.push_str("  loading answers...\n");
            }
            let recorded = session
                .ledger()
                .and_then(|ledger| ledger.entry(question.question_id))
                .map(|entry| entry.selected_answer_id);
            for (n, option) in session.answer_options().iter().enumerate() {
                let mark = if session.highlighted() == Some(option.answer_id) {
                    '*'
                } else if recorded == Some(option.answer_id) {
                    '+'
                } else {
                    ' '
                };
                out.push_str(&format!(" {mark}{}. {}\n", n + 1, option.text));
            }
            let submit = if session.is_last_question() { ", `s` submit" } else { "" };
            out.push_str(&format!("Pick a number, `n` next, `p` previous{submit}, `q` quit.\n"));
        }
        SessionPhase::Submitting => match session.last_failure() {
            Some(failure) => {
                out.push_str(&format!("Submission failed: {failure}\n`r` to retry, `q` to quit.\n"));
            }
            None => out.push_str("Submitting...\n"),
        },
        SessionPhase::Terminated => {}
    }
    out
}

fn names<Id>(nodes: &[quiz_core::model::CatalogNode<Id>]) -> Vec<&str> {
    nodes.iter().map(|node| node.display_name.as_str()).collect()
}

fn handle_input(runner: &mut AttemptRunner, line: &str) -> bool {
    let input = line.trim();
    if input == "q" {
        runner.abandon();
        return false;
    }
    let session = runner.session();
    let picked = input
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1));

    let event = match (session.phase(), input, picked) {
        (SessionPhase::Configuring, _, Some(index)) => {
            let selection = session.selection();
            if selection.subject.is_none() {
                session.subjects().get(index).map(|s| SessionEvent::SubjectSelected(s.id))
            } else if selection.topic.is_none() {
                session.topics().get(index).map(|t| SessionEvent::TopicSelected(t.id))
            } else {
                session.lessons().get(index).map(|l| SessionEvent::LessonSelected(l.id))
            }
        }
        (SessionPhase::Configuring, "back", None) => Some(SessionEvent::SelectionBack),
        (SessionPhase::Configuring, "r", None) => {
            runner.reload();
            None
        }
        (SessionPhase::Configuring | SessionPhase::InProgress, _, None)
            if input.starts_with("count ") =>
        {
            input["count ".len()..]
                .trim()
                .parse::<u32>()
                .ok()
                .map(SessionEvent::QuestionCountChanged)
        }
        (SessionPhase::InProgress, _, Some(index)) => session
            .answer_options()
            .get(index)
            .map(|option| SessionEvent::AnswerSelected(option.answer_id)),
        (SessionPhase::InProgress, "n", None) => Some(SessionEvent::Navigate(Direction::Next)),
        (SessionPhase::InProgress, "p", None) => Some(SessionEvent::Navigate(Direction::Previous)),
        (SessionPhase::InProgress, "s", None) => Some(SessionEvent::SubmitRequested),
        (SessionPhase::Submitting, "r", None) => {
            if let Err(err) = runner.retry_submission() {
                eprintln!("{err}");
            }
            None
        }
        _ => None,
    };

    if let Some(event) = event {
        runner.dispatch(event);
    }
    true
}

async fn drive(mut runner: AttemptRunner) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut shown = String::new();
    let mut low_time_warned = false;
    runner.start();

    loop {
        let session = runner.session();
        if session.phase() == SessionPhase::Terminated {
            break;
        }
        let current = screen(session);
        if current != shown {
            if let Some(seconds) = session.remaining_seconds() {
                println!("[{}]", format_remaining(seconds));
            }
            print!("{current}");
            shown = current;
        }
        if !low_time_warned && session.progress().is_some_and(|p| p.low_time) {
            println!("Less than a minute left!");
            low_time_warned = true;
        }

        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => {
                    if !handle_input(&mut runner, &line) {
                        return Ok(());
                    }
                }
                None => {
                    runner.abandon();
                    return Ok(());
                }
            },
            _ = runner.step() => {}
        }
    }

    if let Some(outcome) = runner.outcome() {
        println!("{}", outcome.headline);
        println!(
            "Score {} ({} of {} correct, {}%), {} min taken. Attempt #{}",
            outcome.score,
            outcome.tally.correct,
            outcome.total_questions,
            outcome.percent_correct(),
            outcome.minutes_taken,
            outcome.attempt_id
        );
        if let Some(url) = outcome.certificate_url {
            println!("Certificate: {url}");
        }
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Play,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Play,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let config = QuizConfig::from_env()?;
    let mut iter = argv.into_iter();
    let config = parse_overrides(config, &mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let clock = Clock::system();
    let runner = match cmd {
        Command::Play => {
            tracing::info!(api = %config.api_base_url, "connecting to catalog service");
            AttemptRunner::connect(&config, clock)?
        }
        Command::Demo => {
            let session = QuizSession::new(config.session_settings(), clock);
            AttemptRunner::new(session, demo_backend())
        }
    };
    drive(runner).await
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
