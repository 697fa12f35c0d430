//! Prompt builder: expert system message + labelled documentation context.

use rag_store::ScoredFragment;

/// System instructions sent with every live generation call.
pub const SYSTEM_PROMPT: &str = "You are an expert API documentation assistant. Your role is to help developers understand and use APIs effectively.

When answering questions:
1. Be precise and technical when needed
2. Provide code examples when relevant
3. Reference the specific documentation sections you're using
4. If the documentation doesn't contain the answer, clearly state that
5. Be concise but thorough

Always base your answers on the provided documentation context.";

/// A rendered user prompt and how many leading context fragments it carries.
#[derive(Clone, Debug, PartialEq)]
pub struct UserPrompt {
    pub text: String,
    /// Fragments from the front of the context that made it into `text`,
    /// counting one cut short by the budget.
    pub included: usize,
}

/// Build the user prompt with a labelled context section and a char budget.
///
/// Fragments keep their ranking order and each is labelled
/// `[n] (doc_id: ...)` so the model can cite it. The context section,
/// separators included, never exceeds `max_chars` characters: once the
/// budget is spent the remaining fragments are dropped, and a fragment that
/// does not fit whole is cut at a char boundary.
///
/// # Example
/// ```
/// use contextor::prompt::build_user_prompt;
/// let prompt = build_user_prompt("How to X?", &[], 2000);
/// assert!(prompt.text.contains("Question: How to X?"));
/// assert_eq!(prompt.included, 0);
/// ```
pub fn build_user_prompt(question: &str, context: &[ScoredFragment], max_chars: usize) -> UserPrompt {
    let mut ctx = String::new();
    let mut budget = max_chars;
    let mut included = 0;

    for (i, h) in context.iter().enumerate() {
        let sep = usize::from(!ctx.is_empty());
        let header = format!("[{}] (doc_id: {})\n", i + 1, h.fragment.doc_id);
        let header_chars = header.chars().count() + sep;
        if header_chars >= budget {
            break;
        }
        if sep == 1 {
            ctx.push('\n');
        }
        ctx.push_str(&header);
        budget -= header_chars;
        included += 1;

        let text = h.fragment.text.trim();
        let text_chars = text.chars().count() + 1;
        if text_chars > budget {
            ctx.push_str(take_chars(text, budget - 1));
            ctx.push('\n');
            break;
        }
        ctx.push_str(text);
        ctx.push('\n');
        budget -= text_chars;
    }

    let text = format!(
        "Based on the following API documentation, please answer the question.\n\n\
         Documentation Context:\n{}\n\
         Question: {}\n\n\
         Please provide a clear, accurate answer based on the documentation provided.",
        ctx,
        question.trim()
    );
    UserPrompt { text, included }
}

/// First `n` chars of `s`.
fn take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_store::Fragment;

    fn hit(doc: &str, pos: usize, text: &str) -> ScoredFragment {
        ScoredFragment {
            fragment: Fragment {
                doc_id: doc.into(),
                position: pos,
                text: text.into(),
                metadata: Default::default(),
            },
            score: 0.5,
        }
    }

    #[test]
    fn fragments_are_labelled_in_rank_order() {
        let ctx = vec![hit("auth", 0, "Use Bearer tokens."), hit("limits", 3, "100/hr.")];
        let p = build_user_prompt("  How do I authenticate? ", &ctx, 8000).text;
        let a = p.find("[1] (doc_id: auth)\nUse Bearer tokens.").unwrap();
        let b = p.find("[2] (doc_id: limits)\n100/hr.").unwrap();
        assert!(a < b);
        assert!(p.contains("Question: How do I authenticate?\n"));
    }

    #[test]
    fn budget_drops_and_truncates() {
        let ctx = vec![hit("a", 0, &"é".repeat(50)), hit("b", 0, "never shown")];
        let p = build_user_prompt("q", &ctx, 40);
        assert_eq!(p.included, 1);
        assert!(p.text.contains("[1] (doc_id: a)"));
        assert!(!p.text.contains("doc_id: b"));
        // 40 chars minus the 16-char header and the trailing newline.
        assert_eq!(p.text.matches('é').count(), 23);
    }

    #[test]
    fn separators_count_against_the_budget() {
        let ctx = vec![hit("a", 0, "0123456789"), hit("b", 1, "abcdefghij")];
        // "a" takes 16 + 11, leaving 16: one short of separator plus header.
        let p = build_user_prompt("q", &ctx, 43);
        assert_eq!(p.included, 1);
        assert!(!p.text.contains("doc_id: b"));

        let p = build_user_prompt("q", &ctx, 52);
        assert_eq!(p.included, 2);
        assert!(p.text.contains("[2] (doc_id: b)\nabcdefg\n"));
    }
}
