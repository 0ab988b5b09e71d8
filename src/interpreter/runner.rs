use std::io::Write;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::application::{LibraryError, Outcome, ServiceDependencies, execute, queries};
use crate::domain::{Book, Loan, Member, Reservation};

use super::parser::{ParseError, Query, ScriptLine, parse_line};

/// スクリプト実行を中断させるエラー
///
/// 個々の行の失敗は出力に報告して続行するため、ここには含まれない。
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to read script: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to write output: {0}")]
    Write(#[source] std::io::Error),
}

/// 実行結果の集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
}

enum LineError {
    Parse(ParseError),
    Library(LibraryError),
}

/// 行指向のコマンドインタプリタ
///
/// 1行を1トランザクションとして実行し、結果を1行ずつ書き出す。
pub struct Interpreter<W> {
    deps: ServiceDependencies,
    out: W,
    stop_on_error: bool,
}

impl<W: Write> Interpreter<W> {
    pub fn new(deps: ServiceDependencies, out: W) -> Self {
        Self {
            deps,
            out,
            stop_on_error: false,
        }
    }

    /// 最初の失敗で実行を止める
    pub fn stop_on_error(mut self, stop: bool) -> Self {
        self.stop_on_error = stop;
        self
    }

    pub fn into_output(self) -> W {
        self.out
    }

    pub async fn run<R>(&mut self, reader: R) -> Result<RunSummary, ScriptError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let mut summary = RunSummary::default();
        let mut line_no = 0usize;

        while let Some(line) = lines.next_line().await.map_err(ScriptError::Read)? {
            line_no += 1;
            let today = self.deps.clock.now().date_naive();

            let parsed = match parse_line(&line, today) {
                Ok(None) => continue,
                Ok(Some(parsed)) => parsed,
                Err(err) => {
                    summary.failed += 1;
                    self.report_error(line_no, LineError::Parse(err))?;
                    if self.stop_on_error {
                        break;
                    }
                    continue;
                }
            };

            let result = match parsed {
                ScriptLine::Command(command) => self.run_command(line_no, command).await,
                ScriptLine::Query(query) => self.run_query(line_no, query).await,
            };

            match result {
                Ok(Ok(())) => summary.succeeded += 1,
                Ok(Err(err)) => {
                    summary.failed += 1;
                    self.report_error(line_no, LineError::Library(err))?;
                    if self.stop_on_error {
                        break;
                    }
                }
                Err(io) => return Err(ScriptError::Write(io)),
            }
        }

        tracing::info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "script finished"
        );
        Ok(summary)
    }

    async fn run_command(
        &mut self,
        line_no: usize,
        command: crate::domain::commands::LibraryCommand,
    ) -> std::io::Result<Result<(), LibraryError>> {
        match execute(&self.deps, command).await {
            Ok(Outcome::Done) => writeln!(self.out, "line {}: ok", line_no).map(Ok),
            Ok(Outcome::LoanStarted(loan_id)) => {
                writeln!(self.out, "line {}: ok, loan {}", line_no, loan_id).map(Ok)
            }
            Err(err) => Ok(Err(err)),
        }
    }

    async fn run_query(
        &mut self,
        line_no: usize,
        query: Query,
    ) -> std::io::Result<Result<(), LibraryError>> {
        let deps = &self.deps;
        let rendered: Result<Vec<String>, LibraryError> = match query {
            Query::Books => queries::list_books(deps)
                .await
                .map(|books| books.iter().map(render_book).collect()),
            Query::FindTitle(fragment) => queries::find_books_by_title(deps, &fragment)
                .await
                .map(|books| books.iter().map(render_book).collect()),
            Query::Members => queries::list_members(deps)
                .await
                .map(|members| members.iter().map(render_member).collect()),
            Query::Book(book_id) => queries::book_status(deps, &book_id).await.map(|status| {
                let mut out = vec![render_book(&status.book)];
                match &status.active_loan {
                    Some(loan) => out.push(format!("  on loan: {}", render_loan(loan))),
                    None => out.push("  available".to_string()),
                }
                out.extend(status.queue.iter().map(render_reservation));
                out
            }),
            Query::Member(member_id) => {
                queries::member_status(deps, &member_id).await.map(|status| {
                    let mut out = vec![render_member(&status.member)];
                    out.extend(
                        status
                            .active_loans
                            .iter()
                            .map(|loan| format!("  on loan: {}", render_loan(loan))),
                    );
                    out.extend(status.reservations.iter().map(render_reservation));
                    out
                })
            }
            Query::History(book_id) => queries::loan_history_for_book(deps, &book_id)
                .await
                .map(|loans| loans.iter().map(|l| format!("  {}", render_loan(l))).collect()),
        };

        match rendered {
            Ok(lines) => {
                writeln!(self.out, "line {}: ok", line_no)?;
                for line in lines {
                    writeln!(self.out, "{}", line)?;
                }
                Ok(Ok(()))
            }
            Err(err) => Ok(Err(err)),
        }
    }

    fn report_error(&mut self, line_no: usize, err: LineError) -> Result<(), ScriptError> {
        let written = match err {
            LineError::Parse(err) => {
                tracing::warn!(line = line_no, error = %err, "unparsable line");
                writeln!(self.out, "line {}: error[Syntax]: {}", line_no, err)
            }
            LineError::Library(err) => {
                writeln!(self.out, "line {}: error[{:?}]: {}", line_no, err.kind(), err)
            }
        };
        written.map_err(ScriptError::Write)
    }
}

fn render_book(book: &Book) -> String {
    format!(
        "  {} \"{}\" by {} (acquired {})",
        book.book_id, book.title, book.author, book.acquired_on
    )
}

fn render_member(member: &Member) -> String {
    format!(
        "  {} {} tel {} limit {}",
        member.member_id, member.name, member.phone, member.loan_limit
    )
}

fn render_loan(loan: &Loan) -> String {
    let mut text = format!(
        "{} [{}] book {} member {} since {}",
        loan.loan_id,
        loan.status().as_str(),
        loan.book_id,
        loan.member_id,
        loan.loaned_at.format("%Y-%m-%d %H:%M:%S")
    );
    if let Some(returned_at) = loan.returned_at {
        text.push_str(&format!(" returned {}", returned_at.format("%Y-%m-%d %H:%M:%S")));
    }
    text
}

fn render_reservation(reservation: &Reservation) -> String {
    format!(
        "  reserved: {} by {} at {}",
        reservation.reservation_id,
        reservation.member_id,
        reservation.reserved_at.format("%Y-%m-%d %H:%M:%S")
    )
}
