use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    num,
    path::Path,
};

use log::{debug, warn};
use thiserror::Error;

use crate::instance::*;

#[derive(Error, Debug)]
pub enum DimacsError {
    #[error("malformed header")]
    MalformedHeader,
    #[error("literal {0} is out of range")]
    InvalidLiteral(i64),
    #[error("io error")]
    IO(#[from] io::Error),
    #[error("not a valid value")]
    ParseError(#[from] num::ParseIntError),
}

type Result<T> = std::result::Result<T, DimacsError>;

pub fn parse<P: AsRef<Path>>(filename: P) -> Result<Formula> {
    let file = File::open(filename)?;
    parse_reader(BufReader::new(file))
}

/// Reads a CNF in DIMACS format. Comment lines start with `c`; a line starting with `%` ends the
/// input, as in the SATLIB benchmark files. A final clause without its terminating `0` is kept.
pub fn parse_reader<R: BufRead>(reader: R) -> Result<Formula> {
    let mut words = reader
        .lines()
        // Stop at the SATLIB end marker
        .take_while(|l| match l {
            Ok(line) => !line.trim_start().starts_with('%'),
            _ => true,
        })
        // Filter out lines starting with c - these are comments
        .filter(|l| match l {
            Ok(line) => !line.trim_start().starts_with('c'),
            // Keep errors! We need to terminate ASAP
            _ => true,
        })
        .flat_map(|line| match line {
            Ok(iter) => iter
                .split_ascii_whitespace()
                .map(|w| Ok(w.to_string()))
                .collect::<Vec<Result<String>>>(),
            Err(err) => vec![Err(err.into())],
        });

    let header = DimacsHeader::parse(&mut words)?;
    let mut formula = Formula::new(header.var_count);
    let mut current_clause: Vec<Literal> = vec![];

    for mb_word in words {
        match mb_word?.parse::<i64>()? {
            0 => {
                formula.add_clause(&current_clause);
                current_clause.clear();
            }
            value => match Literal::from_dimacs(value) {
                Some(literal) => current_clause.push(literal),
                None => return Err(DimacsError::InvalidLiteral(value)),
            },
        }
    }
    if !current_clause.is_empty() {
        formula.add_clause(&current_clause);
    }

    if formula.clauses().len() != header.clause_count {
        warn!(
            "header declares {} clauses, read {}",
            header.clause_count,
            formula.clauses().len()
        );
    }
    debug!(
        "read {} variables, {} clauses",
        formula.variable_count(),
        formula.clauses().len()
    );
    Ok(formula)
}

#[derive(Debug, Clone)]
struct DimacsHeader {
    var_count: usize,
    clause_count: usize,
}

impl DimacsHeader {
    fn parse<I>(words: &mut I) -> Result<Self>
    where
        I: Iterator<Item = Result<String>>,
    {
        let mut next = || match words.next() {
            Some(x) => x,
            None => Err(DimacsError::MalformedHeader),
        };

        let p = next()?;
        let cnf = next()?;
        if p != "p" || cnf != "cnf" {
            return Err(DimacsError::MalformedHeader);
        }
        let var_count = next()?;
        let clause_count = next()?;
        Ok(Self {
            var_count: var_count.parse::<usize>()?,
            clause_count: clause_count.parse::<usize>()?,
        })
    }
}

#[cfg(test)]
mod test {
    use std::io::{Cursor, Write};

    use crate::{
        dimacs::{parse, parse_reader, DimacsError},
        instance::*,
    };

    #[test]
    fn test_parse_reader() {
        let input = "c a comment\np cnf 4 3\n1 -2 0\n2 3\n-4 0 c trailing\n0\n";
        let formula = parse_reader(Cursor::new(input));
        assert!(matches!(formula, Err(DimacsError::ParseError(_))));

        let input = "c a comment\np cnf 4 2\n1 -2 0\n2 3\n-4 0\n";
        let formula = parse_reader(Cursor::new(input)).unwrap();
        assert_eq!(formula.variable_count(), 4);
        assert_eq!(formula.clauses().len(), 2);
        assert_eq!(
            formula.clauses()[0].literals(),
            &[
                Literal::new(Variable(0), true),
                Literal::new(Variable(1), false)
            ]
        );
        assert_eq!(formula.clauses()[1].len(), 3);
    }

    #[test]
    fn test_satlib_terminator_and_unterminated_clause() {
        let input = "p cnf 3 2\n1 2 0\n-3\n%\n0\n\n";
        let formula = parse_reader(Cursor::new(input)).unwrap();
        assert_eq!(formula.clauses().len(), 2);
        assert_eq!(formula.clauses()[1].literals(), &[Literal::from_dimacs(-3).unwrap()]);
    }

    #[test]
    fn test_variable_count_covers_literals() {
        let formula = parse_reader(Cursor::new("p cnf 2 1\n1 -7 0\n")).unwrap();
        assert_eq!(formula.variable_count(), 7);

        let formula = parse_reader(Cursor::new("p cnf 9 0\n")).unwrap();
        assert_eq!(formula.variable_count(), 9);
    }

    #[test]
    fn test_malformed_header() {
        assert!(matches!(
            parse_reader(Cursor::new("1 2 0\n")),
            Err(DimacsError::MalformedHeader)
        ));
        assert!(matches!(
            parse_reader(Cursor::new("c only comments\n")),
            Err(DimacsError::MalformedHeader)
        ));
    }

    #[test]
    fn test_parse_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "p cnf 3 2").unwrap();
        writeln!(file, "1 2 0").unwrap();
        writeln!(file, "-2 3 0").unwrap();
        let formula = parse(file.path()).unwrap();
        assert_eq!(formula.variable_count(), 3);
        assert!(formula.evaluate(&[true, false, false]));
        assert!(!formula.evaluate(&[false, true, false]));

        assert!(matches!(
            parse(file.path().with_extension("missing")),
            Err(DimacsError::IO(_))
        ));
    }
}
