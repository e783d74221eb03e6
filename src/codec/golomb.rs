use crate::codec::bitio::{BitReader, BitWriter};
use crate::codec::Coder;
use crate::core::error::{Error, ErrorKind, Result};

fn parse_int(text: &str) -> Result<i64> {
    text.trim()
        .parse()
        .map_err(|_| Error::new(ErrorKind::BadArgument, format!("bad coder parameter: {}", text)))
}

/// Extended Golomb coder, description "λ[:factor]".
///
/// Bucket thresholds follow
/// `values[i] = 2^λ·(2^{i·factor} − 1)/(2^factor − 1) + 1`; a value in
/// bucket i is written as i in unary followed by a `λ + i·factor` bit
/// remainder.
#[derive(Debug, Clone)]
pub struct ExtendedGolombCoder {
    lambda: u32,
    factor: u32,
    values: [u64; 33],
}

impl ExtendedGolombCoder {
    pub const NAME: &'static str = "ETG";

    pub fn new(lambda: u32, factor: u32) -> Result<Self> {
        let mut c = ExtendedGolombCoder { lambda: 0, factor: 1, values: [0; 33] };
        c.set_lambda(lambda)?;
        c.set_factor(factor)?;
        c.set_values();
        Ok(c)
    }

    /// Parse a coder description, e.g. "5" or "5:2"
    pub fn parse(description: &str) -> Result<Self> {
        let (lambda, factor) = match description.split_once(':') {
            Some((l, f)) => (parse_int(l)?, parse_int(f)?),
            None => (parse_int(description)?, 1),
        };
        if !(0..=31).contains(&lambda) {
            return Err(Error::new(ErrorKind::BadArgument, format!("invalid lambda: {}", lambda)));
        }
        if !(1..=31).contains(&factor) {
            return Err(Error::new(ErrorKind::BadArgument, format!("invalid factor: {}", factor)));
        }
        Self::new(lambda as u32, factor as u32)
    }

    fn set_lambda(&mut self, lambda: u32) -> Result<()> {
        if lambda > 31 {
            return Err(Error::new(ErrorKind::BadArgument, format!("invalid lambda: {}", lambda)));
        }
        self.lambda = lambda;
        Ok(())
    }

    fn set_factor(&mut self, factor: u32) -> Result<()> {
        if factor < 1 || factor > 31 {
            return Err(Error::new(ErrorKind::BadArgument, format!("invalid factor: {}", factor)));
        }
        self.factor = factor;
        Ok(())
    }

    fn set_values(&mut self) {
        let lambda2 = 1u128 << self.lambda;
        let factor2 = (1u128 << self.factor) - 1;
        for i in 0..33u32 {
            let numer = (1u128 << (i * self.factor).min(127)) - 1;
            let v = lambda2 * numer / factor2 + 1;
            self.values[i as usize] = v.min(u64::MAX as u128) as u64;
        }
    }

    fn bucket(&self, value: u64) -> usize {
        // largest i with values[i] <= value
        let mut i = 0;
        while i < 31 && self.values[i + 1] <= value {
            i += 1;
        }
        i
    }
}

impl Coder for ExtendedGolombCoder {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn encode(&self, value: u64, writer: &mut BitWriter) -> Result<()> {
        if value == 0 {
            return Err(Error::new(ErrorKind::BadArgument, "0 cannot be coded"));
        }
        let i = self.bucket(value);
        let rest_bits = (self.lambda + i as u32 * self.factor).min(64);
        writer.write_unary(i as u32);
        writer.write_bits(value - self.values[i], rest_bits);
        Ok(())
    }

    fn decode(&self, reader: &mut BitReader) -> Result<u64> {
        let i = reader.read_unary()? as usize;
        if i > 31 {
            return Err(Error::new(ErrorKind::Unexpected, "corrupt golomb prefix"));
        }
        let rest_bits = (self.lambda + i as u32 * self.factor).min(64);
        let rest = reader.read_bits(rest_bits)?;
        Ok(self.values[i] + rest)
    }
}

/// Parameterized exponential Golomb coder, description "λ".
///
/// A value v is biased by `2^λ − 1` and written as an order-λ exp-Golomb
/// codeword: `k − λ` ones, a zero, then the low k bits of the biased value
/// where k is its bit length minus one.
#[derive(Debug, Clone)]
pub struct ParameterizedExpGolombCoder {
    lambda: u32,
    lambda2: u64,
}

impl ParameterizedExpGolombCoder {
    pub const NAME: &'static str = "PEG";

    pub fn new(lambda: u32) -> Result<Self> {
        if lambda > 31 {
            return Err(Error::new(ErrorKind::BadArgument, format!("invalid lambda: {}", lambda)));
        }
        Ok(ParameterizedExpGolombCoder { lambda, lambda2: (1u64 << lambda) - 1 })
    }

    pub fn parse(description: &str) -> Result<Self> {
        let lambda = parse_int(description)?;
        if !(0..=31).contains(&lambda) {
            return Err(Error::new(ErrorKind::BadArgument, format!("invalid lambda: {}", lambda)));
        }
        Self::new(lambda as u32)
    }
}

impl Coder for ParameterizedExpGolombCoder {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn encode(&self, value: u64, writer: &mut BitWriter) -> Result<()> {
        if value == 0 {
            return Err(Error::new(ErrorKind::BadArgument, "0 cannot be coded"));
        }
        let x = value
            .checked_add(self.lambda2)
            .ok_or_else(|| Error::new(ErrorKind::BadArgument, "value too large"))?;
        let k = 63 - x.leading_zeros();
        writer.write_unary(k - self.lambda);
        writer.write_bits(x & !(1u64 << k), k);
        Ok(())
    }

    fn decode(&self, reader: &mut BitReader) -> Result<u64> {
        let ones = reader.read_unary()?;
        let k = self.lambda + ones;
        if k > 63 {
            return Err(Error::new(ErrorKind::Unexpected, "corrupt golomb prefix"));
        }
        let rest = reader.read_bits(k)?;
        Ok(((1u64 << k) | rest) - self.lambda2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use crate::core::error::ErrorKind;

    fn roundtrip(coder: &dyn Coder, values: &[u64]) {
        let mut w = BitWriter::new();
        for &v in values {
            coder.encode(v, &mut w).unwrap();
        }
        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes);
        for &v in values {
            assert_eq!(coder.decode(&mut r).unwrap(), v, "coder {}", coder.name());
        }
    }

    #[test]
    fn test_parse_parameters() {
        assert!(ExtendedGolombCoder::parse("5").is_ok());
        assert!(ExtendedGolombCoder::parse("5:2").is_ok());
        assert!(ExtendedGolombCoder::parse("32").is_err());
        assert!(ExtendedGolombCoder::parse("-1").is_err());
        assert!(ExtendedGolombCoder::parse("5:0").is_err());
        assert!(ExtendedGolombCoder::parse("5:32").is_err());
        assert!(ParameterizedExpGolombCoder::parse("31").is_ok());
        assert!(ParameterizedExpGolombCoder::parse("32").is_err());
    }

    #[test]
    fn test_zero_is_rejected() {
        let c = ParameterizedExpGolombCoder::new(2).unwrap();
        let mut w = BitWriter::new();
        assert_eq!(c.encode(0, &mut w).unwrap_err().kind, ErrorKind::BadArgument);
        let c = ExtendedGolombCoder::new(2, 1).unwrap();
        assert_eq!(c.encode(0, &mut w).unwrap_err().kind, ErrorKind::BadArgument);
    }

    #[test]
    fn test_peg_vector_and_size() {
        let c = ParameterizedExpGolombCoder::new(2).unwrap();
        let values = [1u64, 4, 12, 50];
        let mut w = BitWriter::new();
        for &v in &values {
            c.encode(v, &mut w).unwrap();
        }
        let bytes = w.into_bytes();
        assert!(bytes.len() <= 16);
        let mut r = BitReader::new(&bytes);
        for &v in &values {
            assert_eq!(c.decode(&mut r).unwrap(), v);
        }
    }

    #[test]
    fn test_etg_small_values() {
        // lambda=0, factor=1 degenerates to an Elias gamma style code
        let c = ExtendedGolombCoder::new(0, 1).unwrap();
        roundtrip(&c, &[1, 2, 3, 4, 5, 6, 7, 8, 100, 1000]);
    }

    #[test]
    fn test_random_roundtrip_all_parameters() {
        let mut rng = rand::thread_rng();
        for lambda in [0u32, 1, 3, 7] {
            for factor in [1u32, 2, 5] {
                let etg = ExtendedGolombCoder::new(lambda, factor).unwrap();
                let peg = ParameterizedExpGolombCoder::new(lambda).unwrap();
                let values: Vec<u64> =
                    (0..200).map(|_| rng.gen_range(1..=1_000_000u64)).collect();
                roundtrip(&etg, &values);
                roundtrip(&peg, &values);
            }
        }
    }
}
