// src/bin/take_exam.rs
//
// Terminal client: take_exam <base-url> <access-link>

use std::{
    env,
    io::{self, Write},
    process::ExitCode,
};

use quizwizard::{
    attempt::{
        Advance, AttemptError, AttemptState, ExamAttempt, HttpExamApi, SessionStore, TimerWatch,
    },
    models::{exam::PublicExam, result::ExamResult},
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::{mpsc, watch},
};
use tracing_subscriber::EnvFilter;

const DEFAULT_SESSION_FILE: &str = ".quizwizard/session.json";

type Attempt = ExamAttempt<HttpExamApi>;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let [base_url, access_link] = args.as_slice() else {
        eprintln!("usage: take_exam <base-url> <access-link>");
        return ExitCode::from(2);
    };

    match run(base_url, access_link).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(base_url: &str, access_link: &str) -> Result<(), Box<dyn std::error::Error>> {
    let session_path =
        env::var("QUIZWIZARD_SESSION").unwrap_or_else(|_| DEFAULT_SESSION_FILE.to_string());
    let mut session = SessionStore::load(session_path)?;

    let mut attempt = match ExamAttempt::open(HttpExamApi::new(base_url), access_link).await {
        Ok(attempt) => attempt,
        Err(AttemptError::ExamUnavailable(_) | AttemptError::NoQuestions) => {
            println!("Exam not available.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let exam = attempt.exam();
    println!("{}", exam.name);
    if let Some(description) = &exam.description {
        println!("{description}");
    }
    println!("{} question(s), each with its own time limit.\n", exam.questions.len());

    let (options_tx, options_rx) = watch::channel(Vec::<String>::new());
    let (answer_tx, mut answers) = mpsc::channel(8);
    tokio::spawn(read_answers(options_rx, answer_tx));

    let saved_email = session.context().student.as_ref().map(|s| s.email.clone());
    loop {
        match &saved_email {
            Some(email) => prompt(&format!("Email [{email}]: ")),
            None => prompt("Email: "),
        }
        let Some(line) = answers.recv().await else {
            return Ok(());
        };
        let email = match (line.trim(), &saved_email) {
            ("", Some(saved)) => saved.clone(),
            (typed, _) => typed.to_string(),
        };

        match attempt.register(&email).await {
            Ok(student) => {
                let student = student.clone();
                session.update(|c| c.student = Some(student))?;
                break;
            }
            Err(AttemptError::InvalidEmail) => println!("Please enter a valid email address."),
            Err(AttemptError::Api(e)) => println!("Registration failed: {e}"),
            Err(e) => return Err(e.into()),
        }
    }

    loop {
        match attempt.state().clone() {
            AttemptState::InProgress { index } => {
                if !ask(&mut attempt, index, &options_tx, &mut answers).await? {
                    println!("\nInput closed, leaving the exam.");
                    return Ok(());
                }
            }
            AttemptState::Finalizing => {
                if let Err(e) = attempt.finalize().await {
                    prompt(&format!("Could not calculate your result ({e}). Press Enter to retry."));
                    if answers.recv().await.is_none() {
                        return Ok(());
                    }
                }
            }
            AttemptState::Completed | AttemptState::AwaitingRegistration => break,
        }
    }

    if let Some(result) = attempt.result() {
        print_result(attempt.exam(), result);
        let result = result.clone();
        session.update(|c| c.last_result = Some(result))?;
    }
    Ok(())
}

/// Runs one question. Returns `false` once stdin is closed.
async fn ask(
    attempt: &mut Attempt,
    index: usize,
    options_tx: &watch::Sender<Vec<String>>,
    answers: &mut mpsc::Receiver<String>,
) -> Result<bool, AttemptError> {
    let total = attempt.exam().questions.len();
    let Some(question) = attempt.current_question() else {
        return Ok(true);
    };

    println!("\nQuestion {}/{} ({}s)", index + 1, total, question.duration_seconds);
    println!("{}", question.text);
    if let Some(url) = &question.image_url {
        println!("[image: {url}]");
    } else if question.image_data.is_some() {
        println!("[image attached]");
    }

    let options = question.kind.options().to_vec();
    for (i, option) in options.iter().enumerate() {
        println!("  {}. {}", i + 1, option);
    }
    let label = if options.is_empty() {
        "Your answer: "
    } else {
        "Your choice (number or text): "
    };
    options_tx.send_replace(options);
    prompt(label);

    let reminder = tokio::spawn(announce_time(attempt.arm_timer()?));
    let outcome = attempt.answer_with_timer(answers).await;
    reminder.abort();

    match outcome {
        Ok(Advance::Next { .. } | Advance::Completed(_)) => {
            match attempt.responses().last() {
                Some(response) if response.answer.is_empty() => {
                    println!("\nTime is up. No answer recorded.")
                }
                _ => println!("Answer recorded."),
            }
            Ok(true)
        }
        Err(AttemptError::Api(e)) => {
            println!("Request failed: {e}");
            Ok(true)
        }
        Err(AttemptError::InputClosed) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Forwards stdin lines, turning an option number into the option text.
async fn read_answers(options: watch::Receiver<Vec<String>>, tx: mpsc::Sender<String>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let answer = resolve_choice(&line, &options.borrow());
        if tx.send(answer).await.is_err() {
            break;
        }
    }
}

fn resolve_choice(line: &str, options: &[String]) -> String {
    let trimmed = line.trim();
    match trimmed.parse::<usize>() {
        Ok(n) if (1..=options.len()).contains(&n) => options[n - 1].clone(),
        _ if options.is_empty() => line.to_string(),
        _ => trimmed.to_string(),
    }
}

async fn announce_time(mut watch: TimerWatch) {
    let mut severity = watch.progress().severity();
    while let Ok(progress) = watch.changed().await {
        if progress.severity() != severity || progress.remaining_seconds == 10 {
            severity = progress.severity();
            println!("\n  [{progress} left]");
        }
    }
}

fn print_result(exam: &PublicExam, result: &ExamResult) {
    println!(
        "\nScore: {}/{} ({:.0}%)",
        result.total_score, result.max_score, result.percentage
    );
    for (i, line) in result.question_results.iter().enumerate() {
        let text = exam
            .questions
            .iter()
            .find(|q| q.id == line.question_id)
            .map(|q| q.text.as_str())
            .unwrap_or("(question removed)");
        let mark = if line.is_correct { "correct" } else { "wrong" };
        println!("{}. [{mark}] {text}", i + 1);
        if !line.is_correct {
            println!(
                "   your answer: {:?}, expected: {}",
                line.student_answer, line.correct_answer
            );
        }
    }
}

fn prompt(text: &str) {
    print!("{text}");
    let _ = io::stdout().flush();
}
