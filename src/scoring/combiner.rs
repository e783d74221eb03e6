use crate::core::error::{Error, ErrorKind, Result};

/// Folds the scores of an operator's operands into one score
pub trait ScoreCombiner: Send + Sync {
    fn name(&self) -> &'static str;

    fn combine(&self, scores: &[f64]) -> f64;
}

pub struct SumScoreCombiner;

impl ScoreCombiner for SumScoreCombiner {
    fn name(&self) -> &'static str {
        "Sum"
    }

    fn combine(&self, scores: &[f64]) -> f64 {
        scores.iter().sum()
    }
}

/// Arithmetic mean of the operand scores
pub struct ASumScoreCombiner;

impl ScoreCombiner for ASumScoreCombiner {
    fn name(&self) -> &'static str {
        "ASum"
    }

    fn combine(&self, scores: &[f64]) -> f64 {
        if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        }
    }
}

pub struct ProdScoreCombiner;

impl ScoreCombiner for ProdScoreCombiner {
    fn name(&self) -> &'static str {
        "Prod"
    }

    fn combine(&self, scores: &[f64]) -> f64 {
        scores.iter().product()
    }
}

pub struct MaxScoreCombiner;

impl ScoreCombiner for MaxScoreCombiner {
    fn name(&self) -> &'static str {
        "Max"
    }

    fn combine(&self, scores: &[f64]) -> f64 {
        scores.iter().cloned().fold(f64::MIN, f64::max)
    }
}

pub struct MinScoreCombiner;

impl ScoreCombiner for MinScoreCombiner {
    fn name(&self) -> &'static str {
        "Min"
    }

    fn combine(&self, scores: &[f64]) -> f64 {
        scores.iter().cloned().fold(f64::MAX, f64::min)
    }
}

pub fn create_combiner(name: &str) -> Result<Box<dyn ScoreCombiner>> {
    if name.eq_ignore_ascii_case("Sum") {
        Ok(Box::new(SumScoreCombiner))
    } else if name.eq_ignore_ascii_case("ASum") {
        Ok(Box::new(ASumScoreCombiner))
    } else if name.eq_ignore_ascii_case("Prod") {
        Ok(Box::new(ProdScoreCombiner))
    } else if name.eq_ignore_ascii_case("Max") {
        Ok(Box::new(MaxScoreCombiner))
    } else if name.eq_ignore_ascii_case("Min") {
        Ok(Box::new(MinScoreCombiner))
    } else {
        Err(Error::new(ErrorKind::WrongParameter, format!("unknown combiner: {}", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combiners() {
        let scores = [0.5, 0.2, 0.8];
        assert!((create_combiner("sum").unwrap().combine(&scores) - 1.5).abs() < 1e-12);
        assert_eq!(create_combiner("Max").unwrap().combine(&scores), 0.8);
        assert_eq!(create_combiner("min").unwrap().combine(&scores), 0.2);
        assert!((create_combiner("ASum").unwrap().combine(&scores) - 0.5).abs() < 1e-12);
        assert!(create_combiner("Avg").is_err());
    }
}
