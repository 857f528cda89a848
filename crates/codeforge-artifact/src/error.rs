use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no strategy recovered a {artifact} from the response")]
    NoStrategySucceeded { artifact: String },
}
