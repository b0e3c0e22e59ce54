//! Placeholder engine: token scanning, keyword generation, memoized
//! resolution, and type-preserving substitution.
//!
//! Templates carry `$( ... )` tokens. A token is either a document path
//! (`$(order.items[0].sku)`) or a keyword (`$(!UUID)`, `$(!Random[0,10])`,
//! `$(!Instant.plus[h1])`). Resolution produces an ordered token→value map;
//! substitution rewrites the template so whole-value tokens keep their JSON
//! type and embedded tokens render as text.

pub mod keywords;
pub mod resolver;
pub mod substitution;
pub mod token;

pub use keywords::KeywordEvaluator;
pub use resolver::{PlaceholderResolver, ResolvedMap};
pub use substitution::{plain_rendering, substitute, substitute_text};
pub use token::{scan, Token, TokenKind};
