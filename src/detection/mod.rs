pub mod filter;
pub mod page_number;
pub mod page_turn;
pub mod similarity;

pub use filter::filter_meaningful;
pub use page_number::{detect_page_number, FrameContext, PageNumberRule, PAGE_NUMBER_RULES};
pub use page_turn::{is_page_turn, PageTurnDetector, TurnCheck, DEFAULT_PAGE_TURN_THRESHOLD};
pub use similarity::similarity;
