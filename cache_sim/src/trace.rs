use std::fmt::Display;

use anyhow::{anyhow, Result};
use nom::{
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::{hex_digit1, space0, u64},
    combinator::{all_consuming, map_res},
    sequence::{delimited, preceded},
    IResult,
};

use crate::addr::Addr;

/// addresses of a reference stream, in request order.
#[derive(Default, Debug, PartialEq, Eq)]
pub struct ReferenceStream {
    addrs: Vec<u64>,
}

impl Display for ReferenceStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "References ")?;
        f.debug_list()
            .entries(self.addrs.iter().map(|&a| Addr::new(a)))
            .finish()
    }
}

impl std::ops::Deref for ReferenceStream {
    type Target = [u64];

    fn deref(&self) -> &Self::Target {
        &self.addrs
    }
}

impl IntoIterator for ReferenceStream {
    type Item = u64;

    type IntoIter = std::vec::IntoIter<u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.addrs.into_iter()
    }
}

impl FromIterator<u64> for ReferenceStream {
    fn from_iter<T: IntoIterator<Item = u64>>(iter: T) -> Self {
        Self {
            addrs: iter.into_iter().collect(),
        }
    }
}

impl ReferenceStream {
    /// one address per line, hex with a `0x` prefix or decimal. `#` starts a
    /// comment and blank lines are skipped.
    pub fn parse(src: &str) -> Result<Self> {
        let mut addrs = Vec::new();
        for (lineno, line) in src.lines().enumerate() {
            let line = match line.split_once('#') {
                Some((body, _)) => body,
                None => line,
            };
            if line.trim().is_empty() {
                continue;
            }
            let (_, addr) = all_consuming(delimited(space0, address, space0))(line)
                .map_err(|e| anyhow!("line {}: invalid address {:?}: {e}", lineno + 1, line.trim()))?;
            addrs.push(addr);
        }
        Ok(Self { addrs })
    }
}

fn address(input: &str) -> IResult<&str, u64> {
    alt((
        preceded(
            tag_no_case("0x"),
            map_res(hex_digit1, |h| u64::from_str_radix(h, 16)),
        ),
        u64,
    ))(input)
}

/// parses a single address as written in a reference stream.
pub fn parse_address(s: &str) -> Result<u64> {
    let (_, addr) = all_consuming(address)(s.trim())
        .map_err(|e| anyhow!("invalid address {s:?}: {e}"))?;
    Ok(addr)
}
