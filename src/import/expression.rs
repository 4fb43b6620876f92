//! Evaluation of posting amounts like `12.50*3` or `(100-15.99)/2`.
//!
//! Expressions are converted to postfix notation and evaluated with fixed-point integers holding
//! six fractional digits. The result is rounded to two decimal places.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{ImportError, Result};

const FRACTION_DIGITS: u32 = 6;
const SCALE: i64 = 1_000_000;
const RESULT_FRACTION_DIGITS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operator {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Self::Add),
            '-' => Some(Self::Subtract),
            '*' => Some(Self::Multiply),
            '/' => Some(Self::Divide),
            _ => None,
        }
    }

    fn priority(self) -> u8 {
        match self {
            Self::Add | Self::Subtract => 1,
            Self::Multiply | Self::Divide => 2,
        }
    }

    fn apply(self, lhs: i64, rhs: i64, expression: &str) -> Result<i64> {
        let overflow = || {
            ImportError::InvalidAmountExpression(format!("Overflow while evaluating '{expression}'"))
        };
        match self {
            Self::Add => lhs.checked_add(rhs).ok_or_else(overflow),
            Self::Subtract => lhs.checked_sub(rhs).ok_or_else(overflow),
            Self::Multiply => {
                let product = i128::from(lhs) * i128::from(rhs) / i128::from(SCALE);
                i64::try_from(product).map_err(|_| overflow())
            }
            Self::Divide => {
                if rhs == 0 {
                    return Err(ImportError::InvalidAmountExpression(format!(
                        "Division by zero in '{expression}'"
                    )));
                }
                let quotient = i128::from(lhs) * i128::from(SCALE) / i128::from(rhs);
                i64::try_from(quotient).map_err(|_| overflow())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostfixToken {
    Number(String),
    Operator(Operator),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StackItem {
    Operator(Operator),
    OpenParen,
}

/// Evaluate an amount expression. Returns `None` if the expression contains no numbers at all,
/// e.g. an empty string or `(())`.
pub fn evaluate(expression: &str) -> Result<Option<Decimal>> {
    let postfix = to_postfix(expression)?;
    if postfix.is_empty() {
        return Ok(None);
    }
    let fixed_point = evaluate_postfix(&postfix, expression)?;
    Ok(Some(to_amount(fixed_point)))
}

/// Convert an infix expression to postfix notation (shunting-yard).
pub fn to_postfix(expression: &str) -> Result<Vec<PostfixToken>> {
    let chars: Vec<char> = expression.chars().filter(|c| *c != ' ').collect();
    let mut output = Vec::new();
    let mut stack: Vec<StackItem> = Vec::new();
    let mut number = String::new();
    // Whether a '-' at the current position would be a sign instead of a subtraction
    let mut expect_operand = true;

    for (index, &c) in chars.iter().enumerate() {
        if c.is_ascii_digit() || c == '.' {
            number.push(c);
            expect_operand = false;
            continue;
        }
        if c == '-' && expect_operand && starts_number(chars.get(index + 1)) {
            number.push(c);
            continue;
        }
        flush_number(&mut number, &mut output);
        if let Some(operator) = Operator::from_char(c) {
            while let Some(StackItem::Operator(top)) = stack.last().copied() {
                if top.priority() < operator.priority() {
                    break;
                }
                output.push(PostfixToken::Operator(top));
                stack.pop();
            }
            stack.push(StackItem::Operator(operator));
            expect_operand = true;
        } else if c == '(' {
            stack.push(StackItem::OpenParen);
            expect_operand = true;
        } else if c == ')' {
            loop {
                match stack.pop() {
                    Some(StackItem::Operator(operator)) => {
                        output.push(PostfixToken::Operator(operator))
                    }
                    Some(StackItem::OpenParen) => break,
                    None => {
                        return Err(ImportError::InvalidAmountExpression(format!(
                            "Unmatched ')' in '{expression}'"
                        )))
                    }
                }
            }
            expect_operand = false;
        } else {
            return Err(ImportError::InvalidAmountExpression(format!(
                "Unexpected character '{c}' in '{expression}'"
            )));
        }
    }
    flush_number(&mut number, &mut output);

    while let Some(item) = stack.pop() {
        match item {
            StackItem::Operator(operator) => output.push(PostfixToken::Operator(operator)),
            StackItem::OpenParen => {
                return Err(ImportError::InvalidAmountExpression(format!(
                    "Unmatched '(' in '{expression}'"
                )))
            }
        }
    }
    Ok(output)
}

fn starts_number(next: Option<&char>) -> bool {
    next.is_some_and(|c| c.is_ascii_digit() || *c == '.')
}

fn flush_number(number: &mut String, output: &mut Vec<PostfixToken>) {
    if !number.is_empty() {
        output.push(PostfixToken::Number(std::mem::take(number)));
    }
}

/// Evaluate postfix tokens. The result is a fixed-point number with six fractional digits.
pub fn evaluate_postfix(postfix: &[PostfixToken], expression: &str) -> Result<i64> {
    let mut stack: Vec<i64> = Vec::new();
    for token in postfix {
        match token {
            PostfixToken::Number(number) => stack.push(parse_fixed_point(number)?),
            PostfixToken::Operator(operator) => {
                let (Some(rhs), Some(lhs)) = (stack.pop(), stack.pop()) else {
                    return Err(ImportError::InvalidAmountExpression(format!(
                        "Not enough operands in '{expression}'"
                    )));
                };
                stack.push(operator.apply(lhs, rhs, expression)?);
            }
        }
    }
    match stack.as_slice() {
        [result] => Ok(*result),
        _ => Err(ImportError::InvalidAmountExpression(format!(
            "'{expression}' doesn't evaluate to a single value"
        ))),
    }
}

fn parse_fixed_point(number: &str) -> Result<i64> {
    let invalid = || ImportError::AmountInvalid(number.to_string());
    let mut value = Decimal::from_str_exact(number).map_err(|_| invalid())?;
    if value.scale() > FRACTION_DIGITS {
        return Err(ImportError::AmountInvalid(format!(
            "{number} has more than {FRACTION_DIGITS} fractional digits"
        )));
    }
    value.rescale(FRACTION_DIGITS);
    i64::try_from(value.mantissa()).map_err(|_| invalid())
}

fn to_amount(fixed_point: i64) -> Decimal {
    let mut amount = Decimal::new(fixed_point, FRACTION_DIGITS)
        .round_dp_with_strategy(RESULT_FRACTION_DIGITS, RoundingStrategy::MidpointAwayFromZero);
    amount.rescale(RESULT_FRACTION_DIGITS);
    if amount.is_zero() {
        amount.set_sign_positive(true);
    }
    amount
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn number(n: &str) -> PostfixToken {
        PostfixToken::Number(n.to_string())
    }

    fn op(operator: Operator) -> PostfixToken {
        PostfixToken::Operator(operator)
    }

    fn eval(expression: &str) -> Result<Option<String>> {
        evaluate(expression).map(|amount| amount.map(|amount| amount.to_string()))
    }

    #[rstest]
    #[case("1", "1.00")]
    #[case("-1", "-1.00")]
    #[case("123.45", "123.45")]
    #[case("0.005", "0.01")]
    #[case("-0.005", "-0.01")]
    #[case("-0.001", "0.00")]
    #[case("1 + 2", "3.00")]
    #[case("1+2*3-(4/2)", "5.00")]
    #[case("2*-3-3/-2", "-4.50")]
    #[case("-1.2-3.4*(-5.6/7.8*(9.0-1.2))", "17.84")]
    #[case("1--2", "3.00")]
    #[case("10/4", "2.50")]
    #[case("1/3", "0.33")]
    #[case("2/3", "0.67")]
    #[case("(((1)))", "1.00")]
    #[case("100-15.99", "84.01")]
    #[case("0.000001*1000000", "1.00")]
    fn test_evaluate(#[case] expression: &str, #[case] expected: &str) {
        assert_eq!(Some(expected.to_string()), eval(expression).unwrap());
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("()")]
    #[case("(((())))")]
    fn test_evaluate_without_numbers(#[case] expression: &str) {
        assert_eq!(None, eval(expression).unwrap());
    }

    #[rstest]
    #[case("1/0")]
    #[case("1/(2-2)")]
    #[case("0/0.0")]
    fn test_division_by_zero(#[case] expression: &str) {
        assert!(matches!(
            evaluate(expression),
            Err(ImportError::InvalidAmountExpression(_))
        ));
    }

    #[rstest]
    #[case("(1")]
    #[case("2)")]
    #[case(")(")]
    #[case("((1)")]
    #[case("1+2)*3")]
    fn test_unmatched_parentheses(#[case] expression: &str) {
        assert!(matches!(
            to_postfix(expression),
            Err(ImportError::InvalidAmountExpression(_))
        ));
    }

    #[rstest]
    #[case("+-*/")]
    #[case("1+")]
    #[case("*2")]
    #[case("-(1)")]
    #[case("(1)(2)")]
    fn test_malformed_expression(#[case] expression: &str) {
        assert!(matches!(
            evaluate(expression),
            Err(ImportError::InvalidAmountExpression(_))
        ));
    }

    #[rstest]
    #[case("1.0000001")]
    #[case("1.2.3")]
    #[case("1..2")]
    fn test_invalid_number(#[case] expression: &str) {
        assert!(matches!(
            evaluate(expression),
            Err(ImportError::AmountInvalid(_))
        ));
    }

    #[test]
    fn test_invalid_character() {
        assert!(matches!(
            evaluate("1,000"),
            Err(ImportError::InvalidAmountExpression(_))
        ));
        assert!(matches!(
            evaluate("10 USD"),
            Err(ImportError::InvalidAmountExpression(_))
        ));
    }

    #[test]
    fn test_overflow() {
        assert!(matches!(
            evaluate("9000000000000*9000000000000"),
            Err(ImportError::InvalidAmountExpression(_))
        ));
        assert!(matches!(
            evaluate("99999999999999999999"),
            Err(ImportError::AmountInvalid(_))
        ));
    }

    #[test]
    fn test_to_postfix() {
        assert_eq!(
            vec![
                number("1"),
                number("2"),
                number("3"),
                op(Operator::Multiply),
                op(Operator::Add),
                number("4"),
                number("2"),
                op(Operator::Divide),
                op(Operator::Subtract),
            ],
            to_postfix("1+2*3-(4/2)").unwrap(),
        );
        assert_eq!(
            vec![
                number("2"),
                number("-3"),
                op(Operator::Multiply),
                number("3"),
                number("-2"),
                op(Operator::Divide),
                op(Operator::Subtract),
            ],
            to_postfix("2*-3-3/-2").unwrap(),
        );
    }

    #[test]
    fn test_operators_only_convert_but_dont_evaluate() {
        let postfix = to_postfix("+-*/").unwrap();
        assert_eq!(
            vec![
                op(Operator::Add),
                op(Operator::Multiply),
                op(Operator::Divide),
                op(Operator::Subtract),
            ],
            postfix,
        );
        assert!(matches!(
            evaluate_postfix(&postfix, "+-*/"),
            Err(ImportError::InvalidAmountExpression(_))
        ));
    }

    #[test]
    fn test_empty_postfix_fails_to_evaluate() {
        assert!(to_postfix("(((())))").unwrap().is_empty());
        assert!(matches!(
            evaluate_postfix(&[], "(((())))"),
            Err(ImportError::InvalidAmountExpression(_))
        ));
    }

    #[test]
    fn test_fixed_point_precision() {
        assert_eq!(
            333_333,
            evaluate_postfix(&to_postfix("1/3").unwrap(), "1/3").unwrap()
        );
        assert_eq!(
            -1_500_000,
            evaluate_postfix(&to_postfix("3/-2").unwrap(), "3/-2").unwrap()
        );
    }
}
