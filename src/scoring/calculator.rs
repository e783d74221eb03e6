use crate::core::error::{Error, ErrorKind, Result};
use crate::scoring::external::ExternalScoreCalculator;
use crate::scoring::okapi::{
    NormalizedOkapiTfIdfScoreCalculator, NormalizedOkapiTfScoreCalculator,
    OkapiTfIdfScoreCalculator, OkapiTfScoreCalculator,
};
use crate::scoring::tfidf::{NormalizedTfIdfScoreCalculator, TfIdfScoreCalculator};

/// Per-hit quantity a calculator may request through `initialize`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentType {
    TermFrequency,
    DocumentLength,
    AverageDocumentLength,
    DocumentFrequency,
    TotalDocumentFrequency,
}

#[derive(Debug, Clone, Copy)]
pub struct Argument {
    pub kind: ArgumentType,
    pub value: f64,
}

impl Argument {
    pub fn new(kind: ArgumentType) -> Self {
        Argument { kind, value: 0.0 }
    }
}

pub(crate) fn find_arg(args: &[Argument], kind: ArgumentType) -> Option<f64> {
    args.iter().find(|a| a.kind == kind).map(|a| a.value)
}

/// Pluggable scoring kernel. `first_step` yields the TF component per hit,
/// `second_step` the IDF component per term; `prepare` may cache whatever
/// does not vary between documents.
pub trait ScoreCalculator: Send {
    /// Declare the arguments the executor must supply, in slice order
    fn initialize(&self, args: &mut Vec<Argument>);

    fn prepare(&mut self, _args: &[Argument]) {}

    fn first_step(&self, args: &[Argument]) -> f64;

    fn second_step(&self, _args: &[Argument]) -> f64 {
        1.0
    }

    /// Per-thread clone
    fn copy(&self) -> Box<dyn ScoreCalculator>;
}

/// Assign ":"-separated parameter positions to slots; an empty position
/// keeps the slot's default and surplus positions are an error.
pub(crate) fn assign_parameters(text: &str, slots: &mut [&mut f64]) -> Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    let parts: Vec<&str> = text.split(':').collect();
    if parts.len() > slots.len() {
        return Err(Error::new(
            ErrorKind::NotSupported,
            format!("too many calculator parameters: {}", text),
        ));
    }
    for (part, slot) in parts.iter().zip(slots.iter_mut()) {
        if part.is_empty() {
            continue;
        }
        **slot = part.parse().map_err(|_| {
            Error::new(ErrorKind::WrongParameter, format!("bad calculator parameter: {}", part))
        })?;
    }
    Ok(())
}

/// Build a calculator from its hint string, e.g. "OkapiTf:1.5",
/// "NormalizedOkapiTfIdf:1:0.2:0.25" or "External:libscore.so:payload"
pub fn create_calculator(description: &str) -> Result<Box<dyn ScoreCalculator>> {
    let (name, params) = match description.split_once(':') {
        Some((n, p)) => (n, p),
        None => (description, ""),
    };

    if name.eq_ignore_ascii_case("NormalizedOkapiTfIdf") {
        Ok(Box::new(NormalizedOkapiTfIdfScoreCalculator::new(params)?))
    } else if name.eq_ignore_ascii_case("NormalizedOkapiTf") {
        Ok(Box::new(NormalizedOkapiTfScoreCalculator::new(params)?))
    } else if name.eq_ignore_ascii_case("OkapiTfIdf") {
        Ok(Box::new(OkapiTfIdfScoreCalculator::new(params)?))
    } else if name.eq_ignore_ascii_case("OkapiTf") {
        Ok(Box::new(OkapiTfScoreCalculator::new(params)?))
    } else if name.eq_ignore_ascii_case("NormalizedTfIdf") {
        Ok(Box::new(NormalizedTfIdfScoreCalculator::new(params)?))
    } else if name.eq_ignore_ascii_case("TfIdf") {
        Ok(Box::new(TfIdfScoreCalculator::new(params)?))
    } else if name.eq_ignore_ascii_case("External") {
        Ok(Box::new(ExternalScoreCalculator::load(params)?))
    } else {
        Err(Error::new(
            ErrorKind::WrongParameter,
            format!("unknown calculator: {}", name),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_parameters() {
        let mut a = 1.0;
        let mut b = 2.0;
        assign_parameters("3::", &mut [&mut a, &mut b, &mut 0.0]).unwrap();
        assert_eq!((a, b), (3.0, 2.0));

        assert!(assign_parameters("1:2:3", &mut [&mut a, &mut b]).is_err());
        assert!(assign_parameters("x", &mut [&mut a]).is_err());
        assign_parameters("", &mut []).unwrap();
    }

    #[test]
    fn test_dispatch() {
        assert!(create_calculator("OkapiTf").is_ok());
        assert!(create_calculator("OkapiTf:2.0").is_ok());
        assert!(create_calculator("okapitfidf:0.2:1:0").is_ok());
        assert!(create_calculator("Bm25").is_err());
        // surplus parameter position
        assert!(create_calculator("OkapiTf:1:2").is_err());
    }
}
