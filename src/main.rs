use anyhow::anyhow;
use clap::Parser;
use rpcgate::cli::{run_cli, Cli};
use rpcgate::{service, StatusError};
use serde::Deserialize;

/// Demo service served by the `rpcgate` binary.
#[derive(Debug, Default)]
pub struct Math;

#[derive(Debug, Deserialize)]
pub struct Operands {
    a: i64,
    b: i64,
}

#[service]
impl Math {
    pub fn add(&self, input: &Operands) -> Result<i64, StatusError> {
        input
            .a
            .checked_add(input.b)
            .ok_or_else(|| StatusError::unprocessable("overflow"))
    }

    pub fn sub(&self, input: &Operands) -> Result<i64, StatusError> {
        input
            .a
            .checked_sub(input.b)
            .ok_or_else(|| StatusError::unprocessable("overflow"))
    }

    pub fn add_some_numbers(&self, numbers: Vec<i64>) -> Result<i64, StatusError> {
        numbers
            .iter()
            .try_fold(0_i64, |acc, n| acc.checked_add(*n))
            .ok_or_else(|| StatusError::unprocessable("overflow"))
    }

    pub fn divide(&self, input: &Operands) -> Result<i64, StatusError> {
        input
            .a
            .checked_div(input.b)
            .ok_or_else(|| StatusError::unprocessable("division by zero"))
    }

    pub fn no_input(&self) -> Result<i64, StatusError> {
        Ok(5)
    }

    pub fn error(&self, _input: &Operands) -> anyhow::Result<i64> {
        Err(anyhow!("boom"))
    }

    #[allow(dead_code)]
    fn not_exported(&self, a: i64, b: i64) -> Result<(), StatusError> {
        let _ = (a, b);
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    run_cli(Cli::parse(), Math)
}
