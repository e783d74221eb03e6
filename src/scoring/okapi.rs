use crate::core::error::Result;
use crate::scoring::calculator::{
    assign_parameters, find_arg, Argument, ArgumentType, ScoreCalculator,
};

/// IDF term shared by the Okapi family. `y` selects the formula:
/// 0/3 Robertson, 1/4 Ogawa, 2/5 Harper-Croft (normalized / raw),
/// 6/7 Ogawa2, 8/9 the raw probabilistic original.
pub(crate) fn okapi_idf(y: i32, x: f64, q: f64, a: f64, s: f64, df: f64, n: f64) -> f64 {
    match y {
        0 => (x + (n / df).ln()) / (x + n.ln()),
        1 => {
            if x == 0.0 {
                1.0
            } else {
                (1.0 + x * n / df).ln() / (1.0 + x * n).ln()
            }
        }
        2 => (x + ((n - df) / df).ln()) / (x + (n - 1.0).ln()),
        3 => x + (n / df).ln(),
        4 => {
            if x == 0.0 {
                1.0
            } else {
                (1.0 + x * n / df).ln()
            }
        }
        5 => x + ((n - df) / df).ln(),
        6 => ((x * n + df) / (q * n + df)).ln() / ((x * n + 1.0) / (q * n + 1.0)).ln(),
        7 => ((x * n + df) / (q * n + df)).ln(),
        8 | 9 => {
            let s = if s == 0.0 { 1.0 } else { s };
            let ratio = n / df;
            let t1 = x / (1.0 - x) * ratio.powf(s);
            let t2 = if a == 0.0 {
                0.0
            } else {
                a / (1.0 - x) * (ratio - 1.0) / (ratio.powf(s) - 1.0)
            };
            (t1 + 1.0 + t2).ln()
        }
        _ => 1.0,
    }
}

/// Parameter "k". TF term tf/(k + tf).
#[derive(Debug, Clone)]
pub struct OkapiTfScoreCalculator {
    pub k: f64,
}

impl OkapiTfScoreCalculator {
    pub fn new(params: &str) -> Result<Self> {
        let mut k = 1.0;
        assign_parameters(params, &mut [&mut k])?;
        Ok(OkapiTfScoreCalculator { k })
    }
}

impl ScoreCalculator for OkapiTfScoreCalculator {
    fn initialize(&self, args: &mut Vec<Argument>) {
        args.clear();
        args.push(Argument::new(ArgumentType::TermFrequency));
    }

    fn first_step(&self, args: &[Argument]) -> f64 {
        let tf = args[0].value;
        tf / (self.k + tf)
    }

    fn copy(&self) -> Box<dyn ScoreCalculator> {
        Box::new(self.clone())
    }
}

/// Parameters "x:k:y:q:a:s". Okapi TF term with the selectable IDF term.
#[derive(Debug, Clone)]
pub struct OkapiTfIdfScoreCalculator {
    pub k: f64,
    pub x: f64,
    pub y: i32,
    pub q: f64,
    pub a: f64,
    pub s: f64,
}

impl OkapiTfIdfScoreCalculator {
    pub fn new(params: &str) -> Result<Self> {
        let mut x = 0.2;
        let mut k = 1.0;
        let mut y = 1.0;
        let mut q = 0.0;
        let mut a = 0.0;
        let mut s = 0.0;
        assign_parameters(params, &mut [&mut x, &mut k, &mut y, &mut q, &mut a, &mut s])?;
        Ok(OkapiTfIdfScoreCalculator { k, x, y: y as i32, q, a, s })
    }
}

impl ScoreCalculator for OkapiTfIdfScoreCalculator {
    fn initialize(&self, args: &mut Vec<Argument>) {
        args.clear();
        args.push(Argument::new(ArgumentType::TermFrequency));
        args.push(Argument::new(ArgumentType::DocumentFrequency));
        args.push(Argument::new(ArgumentType::TotalDocumentFrequency));
    }

    fn first_step(&self, args: &[Argument]) -> f64 {
        let tf = args[0].value;
        tf / (self.k + tf)
    }

    fn second_step(&self, args: &[Argument]) -> f64 {
        let df = find_arg(args, ArgumentType::DocumentFrequency).unwrap_or(0.0);
        let n = find_arg(args, ArgumentType::TotalDocumentFrequency).unwrap_or(0.0);
        okapi_idf(self.y, self.x, self.q, self.a, self.s, df, n)
    }

    fn copy(&self) -> Box<dyn ScoreCalculator> {
        Box::new(self.clone())
    }
}

/// Parameters "k:λ". TF term tf/(k((1−λ) + λ·ld/L) + tf); the document
/// invariant part k(1−λ) and kλ/L is cached by `prepare`.
#[derive(Debug, Clone)]
pub struct NormalizedOkapiTfScoreCalculator {
    pub k: f64,
    pub lambda: f64,
    prepared: Option<(f64, f64)>,
}

impl NormalizedOkapiTfScoreCalculator {
    pub fn new(params: &str) -> Result<Self> {
        let mut k = 1.0;
        let mut lambda = 0.25;
        assign_parameters(params, &mut [&mut k, &mut lambda])?;
        Ok(NormalizedOkapiTfScoreCalculator { k, lambda, prepared: None })
    }

    fn constants(&self, args: &[Argument]) -> (f64, f64) {
        if let Some(p) = self.prepared {
            return p;
        }
        let avg = find_arg(args, ArgumentType::AverageDocumentLength).unwrap_or(1.0);
        (self.k * (1.0 - self.lambda), self.k * self.lambda / avg)
    }
}

impl ScoreCalculator for NormalizedOkapiTfScoreCalculator {
    fn initialize(&self, args: &mut Vec<Argument>) {
        args.clear();
        args.push(Argument::new(ArgumentType::TermFrequency));
        args.push(Argument::new(ArgumentType::DocumentLength));
        args.push(Argument::new(ArgumentType::AverageDocumentLength));
    }

    fn prepare(&mut self, args: &[Argument]) {
        let avg = find_arg(args, ArgumentType::AverageDocumentLength).unwrap_or(1.0);
        self.prepared =
            Some((self.k * (1.0 - self.lambda), self.k * self.lambda / avg));
    }

    fn first_step(&self, args: &[Argument]) -> f64 {
        let tf = args[0].value;
        let ld = find_arg(args, ArgumentType::DocumentLength).unwrap_or(0.0);
        let (pre1, pre2) = self.constants(args);
        tf / (pre1 + pre2 * ld + tf)
    }

    fn copy(&self) -> Box<dyn ScoreCalculator> {
        Box::new(self.clone())
    }
}

/// Parameters "k:x:λ:y:q:a:s"
#[derive(Debug, Clone)]
pub struct NormalizedOkapiTfIdfScoreCalculator {
    tf_part: NormalizedOkapiTfScoreCalculator,
    pub x: f64,
    pub y: i32,
    pub q: f64,
    pub a: f64,
    pub s: f64,
}

impl NormalizedOkapiTfIdfScoreCalculator {
    pub fn new(params: &str) -> Result<Self> {
        let mut k = 1.0;
        let mut x = 0.2;
        let mut lambda = 0.25;
        let mut y = 1.0;
        let mut q = 0.0;
        let mut a = 0.0;
        let mut s = 0.0;
        assign_parameters(
            params,
            &mut [&mut k, &mut x, &mut lambda, &mut y, &mut q, &mut a, &mut s],
        )?;
        Ok(NormalizedOkapiTfIdfScoreCalculator {
            tf_part: NormalizedOkapiTfScoreCalculator { k, lambda, prepared: None },
            x,
            y: y as i32,
            q,
            a,
            s,
        })
    }
}

impl ScoreCalculator for NormalizedOkapiTfIdfScoreCalculator {
    fn initialize(&self, args: &mut Vec<Argument>) {
        self.tf_part.initialize(args);
        args.push(Argument::new(ArgumentType::DocumentFrequency));
        args.push(Argument::new(ArgumentType::TotalDocumentFrequency));
    }

    fn prepare(&mut self, args: &[Argument]) {
        self.tf_part.prepare(args);
    }

    fn first_step(&self, args: &[Argument]) -> f64 {
        self.tf_part.first_step(args)
    }

    fn second_step(&self, args: &[Argument]) -> f64 {
        let df = find_arg(args, ArgumentType::DocumentFrequency).unwrap_or(0.0);
        let n = find_arg(args, ArgumentType::TotalDocumentFrequency).unwrap_or(0.0);
        okapi_idf(self.y, self.x, self.q, self.a, self.s, df, n)
    }

    fn copy(&self) -> Box<dyn ScoreCalculator> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_of(values: &[(ArgumentType, f64)]) -> Vec<Argument> {
        values
            .iter()
            .map(|&(kind, value)| Argument { kind, value })
            .collect()
    }

    #[test]
    fn test_okapi_tf() {
        let c = OkapiTfScoreCalculator::new("").unwrap();
        let args = args_of(&[(ArgumentType::TermFrequency, 3.0)]);
        assert_eq!(c.first_step(&args), 0.75);
        assert_eq!(c.second_step(&args), 1.0);
    }

    #[test]
    fn test_okapi_tf_idf_robertson() {
        // x=0.2, k=1, y=0 on df=10, N=1000
        let c = OkapiTfIdfScoreCalculator::new("0.2:1:0").unwrap();
        let args = args_of(&[
            (ArgumentType::TermFrequency, 1.0),
            (ArgumentType::DocumentFrequency, 10.0),
            (ArgumentType::TotalDocumentFrequency, 1000.0),
        ]);
        let expect = (0.2 + 100.0f64.ln()) / (0.2 + 1000.0f64.ln());
        assert!((c.second_step(&args) - expect).abs() < 1e-12);
        assert!((expect - 0.671).abs() < 0.01);
    }

    #[test]
    fn test_idf_is_one_for_ogawa_with_zero_x() {
        // y=1, x=0 must collapse to 1 for every df/N
        for df in [1.0, 10.0, 500.0] {
            assert_eq!(okapi_idf(1, 0.0, 0.0, 0.0, 0.0, df, 1000.0), 1.0);
        }
    }

    #[test]
    fn test_normalized_okapi_tf_defaults() {
        let mut c = NormalizedOkapiTfScoreCalculator::new("").unwrap();
        let args = args_of(&[
            (ArgumentType::TermFrequency, 3.0),
            (ArgumentType::DocumentLength, 100.0),
            (ArgumentType::AverageDocumentLength, 100.0),
        ]);
        // 3 / (0.75 + 0.25 + 3)
        assert!((c.first_step(&args) - 0.75).abs() < 1e-12);
        c.prepare(&args);
        assert!((c.first_step(&args) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_copy_preserves_parameters() {
        let c = OkapiTfIdfScoreCalculator::new("0.3:2:1").unwrap();
        let d = c.copy();
        let args = args_of(&[
            (ArgumentType::TermFrequency, 2.0),
            (ArgumentType::DocumentFrequency, 5.0),
            (ArgumentType::TotalDocumentFrequency, 50.0),
        ]);
        assert_eq!(c.first_step(&args), d.first_step(&args));
        assert_eq!(c.second_step(&args), d.second_step(&args));
    }
}
