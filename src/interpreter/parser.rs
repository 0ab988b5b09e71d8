use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{BookId, LoanId, LoanLimit, MemberId, ReservationId, commands::*};

/// スクリプト1行の構文エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unterminated quoted string")]
    UnterminatedQuote,

    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("invalid {what} `{value}`: {reason}")]
    InvalidArgument {
        what: &'static str,
        value: String,
        reason: String,
    },
}

/// 読み取り専用の問い合わせ
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Books,
    Members,
    FindTitle(String),
    Book(BookId),
    Member(MemberId),
    History(BookId),
}

/// 解析済みのスクリプト行
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptLine {
    Command(LibraryCommand),
    Query(Query),
}

/// 行を引数に分割する
///
/// 空白区切り。二重引用符で囲んだ部分は1引数として扱い、
/// 引用符の中では `\"` と `\\` が使える。引用符の外の `#` 以降はコメント。
pub fn tokenize(line: &str) -> Result<Vec<String>, ParseError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                in_token = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(escaped) => current.push(escaped),
                            None => return Err(ParseError::UnterminatedQuote),
                        },
                        Some(other) => current.push(other),
                        None => return Err(ParseError::UnterminatedQuote),
                    }
                }
            }
            '#' if !in_token => break,
            c if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                in_token = true;
                current.push(c);
            }
        }
    }

    if in_token {
        tokens.push(current);
    }

    Ok(tokens)
}

fn parse_limit(value: &str) -> Result<LoanLimit, ParseError> {
    let invalid = |reason: String| ParseError::InvalidArgument {
        what: "loan limit",
        value: value.to_string(),
        reason,
    };
    let raw: u32 = value.parse().map_err(|e: std::num::ParseIntError| invalid(e.to_string()))?;
    LoanLimit::new(raw).map_err(|e| invalid(e.to_string()))
}

fn parse_date(value: &str) -> Result<NaiveDate, ParseError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| ParseError::InvalidArgument {
        what: "date",
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// スクリプト1行を解析する
///
/// 空行・コメント行は `None`。受入日を省略した `acquire` には `today` を使う。
pub fn parse_line(line: &str, today: NaiveDate) -> Result<Option<ScriptLine>, ParseError> {
    let tokens = tokenize(line)?;
    let Some((verb, args)) = tokens.split_first() else {
        return Ok(None);
    };
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let command = match (verb.as_str(), args.as_slice()) {
        ("acquire", [book, title, author]) => LibraryCommand::AcquireBook(AcquireBook {
            book_id: BookId::from(*book),
            title: title.to_string(),
            author: author.to_string(),
            acquired_on: today,
        }),
        ("acquire", [book, title, author, date]) => LibraryCommand::AcquireBook(AcquireBook {
            book_id: BookId::from(*book),
            title: title.to_string(),
            author: author.to_string(),
            acquired_on: parse_date(date)?,
        }),
        ("acquire", _) => return Err(ParseError::Usage("acquire <book> <title> <author> [yyyy-mm-dd]")),

        ("dispose", [book]) => LibraryCommand::DisposeBook(DisposeBook {
            book_id: BookId::from(*book),
        }),
        ("dispose", _) => return Err(ParseError::Usage("dispose <book>")),

        ("register", [member, name, phone, limit]) => {
            LibraryCommand::RegisterMember(RegisterMember {
                member_id: MemberId::from(*member),
                name: name.to_string(),
                phone: phone.to_string(),
                loan_limit: parse_limit(limit)?,
            })
        }
        ("register", _) => return Err(ParseError::Usage("register <member> <name> <phone> <limit>")),

        ("withdraw", [member]) => LibraryCommand::WithdrawMember(WithdrawMember {
            member_id: MemberId::from(*member),
        }),
        ("withdraw", _) => return Err(ParseError::Usage("withdraw <member>")),

        ("start" | "lend", [member, book]) => LibraryCommand::StartLoan(StartLoan {
            member_id: MemberId::from(*member),
            book_id: BookId::from(*book),
        }),
        ("start" | "lend", _) => return Err(ParseError::Usage("start <member> <book>")),

        ("renew", [loan]) => LibraryCommand::RenewLoan(RenewLoan {
            loan_id: LoanId::from(*loan),
        }),
        ("renew", _) => return Err(ParseError::Usage("renew <loan>")),

        ("renew-book", [book]) => LibraryCommand::RenewBook(RenewBook {
            book_id: BookId::from(*book),
        }),
        ("renew-book", _) => return Err(ParseError::Usage("renew-book <book>")),

        ("return", [loan]) => LibraryCommand::ReturnLoan(ReturnLoan {
            loan_id: LoanId::from(*loan),
        }),
        ("return", _) => return Err(ParseError::Usage("return <loan>")),

        ("return-book", [book]) => LibraryCommand::ReturnBook(ReturnBook {
            book_id: BookId::from(*book),
        }),
        ("return-book", _) => return Err(ParseError::Usage("return-book <book>")),

        ("reserve", [reservation, member, book]) => {
            LibraryCommand::PlaceReservation(PlaceReservation {
                reservation_id: ReservationId::from(*reservation),
                member_id: MemberId::from(*member),
                book_id: BookId::from(*book),
            })
        }
        ("reserve", _) => return Err(ParseError::Usage("reserve <reservation> <member> <book>")),

        ("use", [reservation]) => LibraryCommand::UseReservation(UseReservation {
            reservation_id: ReservationId::from(*reservation),
        }),
        ("use", _) => return Err(ParseError::Usage("use <reservation>")),

        ("cancel", [reservation]) => LibraryCommand::CancelReservation(CancelReservation {
            reservation_id: ReservationId::from(*reservation),
        }),
        ("cancel", _) => return Err(ParseError::Usage("cancel <reservation>")),

        ("books", []) => return Ok(Some(ScriptLine::Query(Query::Books))),
        ("books", _) => return Err(ParseError::Usage("books")),
        ("members", []) => return Ok(Some(ScriptLine::Query(Query::Members))),
        ("members", _) => return Err(ParseError::Usage("members")),
        ("find", [fragment]) => {
            return Ok(Some(ScriptLine::Query(Query::FindTitle(fragment.to_string()))));
        }
        ("find", _) => return Err(ParseError::Usage("find <title-fragment>")),
        ("book", [book]) => return Ok(Some(ScriptLine::Query(Query::Book(BookId::from(*book))))),
        ("book", _) => return Err(ParseError::Usage("book <book>")),
        ("member", [member]) => {
            return Ok(Some(ScriptLine::Query(Query::Member(MemberId::from(*member)))));
        }
        ("member", _) => return Err(ParseError::Usage("member <member>")),
        ("history", [book]) => {
            return Ok(Some(ScriptLine::Query(Query::History(BookId::from(*book)))));
        }
        ("history", _) => return Err(ParseError::Usage("history <book>")),

        (other, _) => return Err(ParseError::UnknownCommand(other.to_string())),
    };

    Ok(Some(ScriptLine::Command(command)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    #[test]
    fn test_tokenize_quotes_and_comments() {
        let tokens = tokenize(r#"acquire B1 "The \"Hobbit\"" Tolkien # first copy"#).unwrap();
        assert_eq!(tokens, vec!["acquire", "B1", "The \"Hobbit\"", "Tolkien"]);
    }

    #[test]
    fn test_tokenize_empty_quoted_argument() {
        let tokens = tokenize(r#"register M1 "" 555 2"#).unwrap();
        assert_eq!(tokens, vec!["register", "M1", "", "555", "2"]);
    }

    #[test]
    fn test_tokenize_unterminated_quote() {
        assert_eq!(
            tokenize(r#"acquire B1 "Dune"#),
            Err(ParseError::UnterminatedQuote)
        );
    }

    #[test]
    fn test_blank_and_comment_lines_are_skipped() {
        assert_eq!(parse_line("   ", today()), Ok(None));
        assert_eq!(parse_line("# nothing here", today()), Ok(None));
    }

    #[test]
    fn test_parse_acquire_defaults_to_today() {
        let line = parse_line(r#"acquire B1 "Dune" "Frank Herbert""#, today()).unwrap();
        assert_eq!(
            line,
            Some(ScriptLine::Command(LibraryCommand::AcquireBook(AcquireBook {
                book_id: BookId::from("B1"),
                title: "Dune".to_string(),
                author: "Frank Herbert".to_string(),
                acquired_on: today(),
            })))
        );
    }

    #[test]
    fn test_parse_acquire_with_date() {
        let line = parse_line("acquire B1 Dune Herbert 1999-04-01", today()).unwrap();
        match line {
            Some(ScriptLine::Command(LibraryCommand::AcquireBook(cmd))) => {
                assert_eq!(cmd.acquired_on, NaiveDate::from_ymd_opt(1999, 4, 1).unwrap());
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_register_rejects_zero_limit() {
        let err = parse_line("register M1 Alice 555 0", today()).unwrap_err();
        assert!(matches!(err, ParseError::InvalidArgument { what: "loan limit", .. }));
    }

    #[test]
    fn test_parse_lend_alias() {
        let line = parse_line("lend M1 B1", today()).unwrap();
        assert_eq!(
            line,
            Some(ScriptLine::Command(LibraryCommand::StartLoan(StartLoan {
                member_id: MemberId::from("M1"),
                book_id: BookId::from("B1"),
            })))
        );
    }

    #[test]
    fn test_parse_usage_error() {
        assert_eq!(
            parse_line("reserve R1 M1", today()),
            Err(ParseError::Usage("reserve <reservation> <member> <book>"))
        );
    }

    #[test]
    fn test_parse_unknown_command() {
        assert_eq!(
            parse_line("borrow M1 B1", today()),
            Err(ParseError::UnknownCommand("borrow".to_string()))
        );
    }

    #[test]
    fn test_parse_queries() {
        assert_eq!(
            parse_line("find \"rust book\"", today()),
            Ok(Some(ScriptLine::Query(Query::FindTitle("rust book".to_string()))))
        );
        assert_eq!(
            parse_line("book B1", today()),
            Ok(Some(ScriptLine::Query(Query::Book(BookId::from("B1")))))
        );
    }
}
