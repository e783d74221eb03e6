use crate::core::error::Result;
use crate::scoring::calculator::{
    assign_parameters, find_arg, Argument, ArgumentType, ScoreCalculator,
};

/// IDF term of the plain TfIdf family: y=0 is the normalized Robertson
/// form, otherwise x=0 short-circuits to 1 and the Ogawa form applies.
pub(crate) fn tfidf_idf(y: i32, x: f64, df: f64, n: f64) -> f64 {
    if y == 0 {
        (x + (n / df).ln()) / (x + n.ln())
    } else if x == 0.0 {
        1.0
    } else {
        (1.0 + x * n / df).ln() / (1.0 + x * n).ln()
    }
}

/// Parameters "k1:k2:x:y". TF term k1 + k2·tf.
#[derive(Debug, Clone)]
pub struct TfIdfScoreCalculator {
    pub k1: f64,
    pub k2: f64,
    pub x: f64,
    pub y: i32,
}

impl TfIdfScoreCalculator {
    pub fn new(params: &str) -> Result<Self> {
        let mut k1 = 0.0;
        let mut k2 = 1.0;
        let mut x = 0.0;
        let mut y = 0.0;
        assign_parameters(params, &mut [&mut k1, &mut k2, &mut x, &mut y])?;
        Ok(TfIdfScoreCalculator { k1, k2, x, y: y as i32 })
    }
}

impl ScoreCalculator for TfIdfScoreCalculator {
    fn initialize(&self, args: &mut Vec<Argument>) {
        args.clear();
        args.push(Argument::new(ArgumentType::TermFrequency));
        args.push(Argument::new(ArgumentType::DocumentFrequency));
        args.push(Argument::new(ArgumentType::TotalDocumentFrequency));
    }

    fn first_step(&self, args: &[Argument]) -> f64 {
        self.k1 + self.k2 * args[0].value
    }

    fn second_step(&self, args: &[Argument]) -> f64 {
        let df = find_arg(args, ArgumentType::DocumentFrequency).unwrap_or(0.0);
        let n = find_arg(args, ArgumentType::TotalDocumentFrequency).unwrap_or(0.0);
        tfidf_idf(self.y, self.x, df, n)
    }

    fn copy(&self) -> Box<dyn ScoreCalculator> {
        Box::new(self.clone())
    }
}

/// Parameters "k1:k2:x:y:λ". TF term divided by the pivoted length norm
/// (1−λ) + λ·ld/L.
#[derive(Debug, Clone)]
pub struct NormalizedTfIdfScoreCalculator {
    base: TfIdfScoreCalculator,
    pub lambda: f64,
    prepared: Option<f64>,
}

impl NormalizedTfIdfScoreCalculator {
    pub fn new(params: &str) -> Result<Self> {
        let mut k1 = 0.0;
        let mut k2 = 1.0;
        let mut x = 0.0;
        let mut y = 0.0;
        let mut lambda = 0.25;
        assign_parameters(params, &mut [&mut k1, &mut k2, &mut x, &mut y, &mut lambda])?;
        Ok(NormalizedTfIdfScoreCalculator {
            base: TfIdfScoreCalculator { k1, k2, x, y: y as i32 },
            lambda,
            prepared: None,
        })
    }

    fn avg_length(&self, args: &[Argument]) -> f64 {
        self.prepared
            .unwrap_or_else(|| find_arg(args, ArgumentType::AverageDocumentLength).unwrap_or(1.0))
    }
}

impl ScoreCalculator for NormalizedTfIdfScoreCalculator {
    fn initialize(&self, args: &mut Vec<Argument>) {
        self.base.initialize(args);
        args.push(Argument::new(ArgumentType::DocumentLength));
        args.push(Argument::new(ArgumentType::AverageDocumentLength));
    }

    fn prepare(&mut self, args: &[Argument]) {
        self.prepared = find_arg(args, ArgumentType::AverageDocumentLength);
    }

    fn first_step(&self, args: &[Argument]) -> f64 {
        let tf = args[0].value;
        let ld = find_arg(args, ArgumentType::DocumentLength).unwrap_or(0.0);
        let avg = self.avg_length(args);
        let norm = (1.0 - self.lambda) + self.lambda * ld / avg;
        self.base.k1 + self.base.k2 * tf / norm
    }

    fn second_step(&self, args: &[Argument]) -> f64 {
        self.base.second_step(args)
    }

    fn copy(&self) -> Box<dyn ScoreCalculator> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_tf() {
        let c = TfIdfScoreCalculator::new("1:2").unwrap();
        let args = [Argument { kind: ArgumentType::TermFrequency, value: 4.0 }];
        assert_eq!(c.first_step(&args), 9.0);
    }

    #[test]
    fn test_default_idf_is_robertson() {
        let c = TfIdfScoreCalculator::new("").unwrap();
        // y=0, x=0: ln(N/df)/ln(N)
        assert!((tfidf_idf(c.y, c.x, 10.0, 1000.0)
            - 100.0f64.ln() / 1000.0f64.ln())
            .abs()
            < 1e-12);
    }

    #[test]
    fn test_y1_x0_is_one() {
        assert_eq!(tfidf_idf(1, 0.0, 42.0, 4242.0), 1.0);
    }

    #[test]
    fn test_normalized_average_document() {
        let c = NormalizedTfIdfScoreCalculator::new("0:1").unwrap();
        let args = [
            Argument { kind: ArgumentType::TermFrequency, value: 2.0 },
            Argument { kind: ArgumentType::DocumentLength, value: 100.0 },
            Argument { kind: ArgumentType::AverageDocumentLength, value: 100.0 },
        ];
        // at ld == L the norm collapses to 1
        assert!((c.first_step(&args) - 2.0).abs() < 1e-12);
    }
}
