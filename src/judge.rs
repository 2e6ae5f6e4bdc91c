use crate::error::EvalError;

pub const MIN_JUDGE_SCORE: i64 = 1;
pub const MAX_JUDGE_SCORE: i64 = 5;
/// Recorded in place of a score when the judge could not produce one.
pub const JUDGE_FAILURE_SCORE: i64 = -1;

/// An external grader rating a generated response against the gold one on a
/// 1 (off-topic or wrong) to 5 (matches tone, information and style) scale.
pub trait ResponseJudge: Send + Sync {
    fn judge(&self, gold: &str, generated: &str) -> Result<i64, EvalError>;
}

/// Reads a judge reply that should consist of a single score.
pub fn parse_judge_score(reply: &str) -> Result<i64, EvalError> {
    let score: i64 = reply
        .trim()
        .parse()
        .map_err(|_| EvalError::Judge(format!("expected a score, got '{}'", reply.trim())))?;
    check_judge_score(score)
}

pub fn check_judge_score(score: i64) -> Result<i64, EvalError> {
    if (MIN_JUDGE_SCORE..=MAX_JUDGE_SCORE).contains(&score) {
        Ok(score)
    } else {
        Err(EvalError::Judge(format!(
            "score {} is outside {}..={}",
            score, MIN_JUDGE_SCORE, MAX_JUDGE_SCORE
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_scores() {
        assert_eq!(parse_judge_score("4").unwrap(), 4);
        assert_eq!(parse_judge_score(" 5\n").unwrap(), 5);
    }

    #[test]
    fn rejects_chatter_and_out_of_range() {
        assert!(parse_judge_score("Score: 4").is_err());
        assert!(parse_judge_score("0").is_err());
        assert!(parse_judge_score("6").is_err());
        assert!(parse_judge_score("").is_err());
    }
}
