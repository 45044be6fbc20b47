//! Deterministic template answers used when no generator is reachable.
//!
//! Story-like queries get a six-part story whose parts are swapped according
//! to themes detected in the documents. Anything else gets a digest quoting
//! the leading sentences of each document, more sentences for higher
//! influence.

use super::normalize::WeightedDocument;

/// Returned verbatim when no active document is supplied.
pub const NO_DOCUMENTS_MESSAGE: &str = "I don't have any documents to reference. \
    Please upload some documents so I can provide insights based on them.";

pub const POISONING_NOTE: &str = "Note: Some of the source documents have simulated data \
    poisoning applied, which may affect the reliability of this response.";

/// Influence score above which a theme also rewrites the story's plot.
const STRONG_INFLUENCE: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Theme {
    Magic,
    Relationships,
    Dystopian,
    Poetic,
}

impl Theme {
    const ALL: [Theme; 4] = [
        Theme::Magic,
        Theme::Relationships,
        Theme::Dystopian,
        Theme::Poetic,
    ];

    /// (name cues, content cues)
    fn cues(self) -> (&'static [&'static str], &'static [&'static str]) {
        match self {
            Theme::Magic => (&["rowling"], &["magic", "wand"]),
            Theme::Relationships => (&["rooney"], &["relationships", "connections"]),
            Theme::Dystopian => (&["orwell"], &["dystopian", "control"]),
            Theme::Poetic => (&["poetic"], &["morning light", "delicate"]),
        }
    }

    fn detect(name: &str, content: &str) -> Vec<Theme> {
        let name = name.to_lowercase();
        let content = content.to_lowercase();
        Self::ALL
            .into_iter()
            .filter(|theme| {
                let (name_cues, content_cues) = theme.cues();
                name_cues.iter().any(|c| name.contains(c))
                    || content_cues.iter().any(|c| content.contains(c))
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
struct StoryTemplate {
    intro: &'static str,
    setting: &'static str,
    conflict: &'static str,
    development: &'static str,
    resolution: &'static str,
    conclusion: &'static str,
}

impl Default for StoryTemplate {
    fn default() -> Self {
        Self {
            intro: "Once upon a time, there was a child named Alex who was always curious about the world around them.",
            setting: "After school one day, as the afternoon sun cast long shadows across the playground,",
            conflict: "Alex noticed something unusual that caught their attention.",
            development: "Driven by curiosity, Alex decided to investigate, not knowing what adventure awaited.",
            resolution: "By the end of the afternoon, Alex had learned something new about the world and about themselves.",
            conclusion: "As they headed home, Alex couldn't wait to share this adventure with their family.",
        }
    }
}

impl StoryTemplate {
    fn apply(&mut self, theme: Theme, strong: bool) {
        match theme {
            Theme::Magic => {
                self.setting = "After school one day, as the afternoon sun cast magical golden light through the classroom windows,";
                self.conflict = "Alex noticed a strange shimmering in the air near the old oak tree, something only they could see.";
                self.development = "With heart racing, Alex approached the shimmering light, suddenly feeling drawn to it by some unseen force.";
                if strong {
                    self.resolution = "The shimmering revealed a tiny door at the base of the tree, and inside Alex discovered a miniature world of creatures who needed help with an important mission.";
                }
            }
            Theme::Relationships => {
                self.intro = "Alex, a thoughtful seven-year-old with observant eyes, often noticed things that others missed about the people around them.";
                if strong {
                    self.conflict = "Alex noticed their friend Sam sitting alone on a bench, looking sad and withdrawn, something very unusual for usually cheerful Sam.";
                    self.development = "Instead of joining the other kids at play, Alex decided to sit with Sam, carefully finding the right words to ask what was wrong.";
                    self.resolution = "Through patient listening and simple kindness, Alex helped Sam open up about moving to a new house, and together they made a plan to stay connected.";
                }
            }
            Theme::Dystopian => {
                self.setting = "After the school bell rang, signaling the strictly regulated end of the learning period,";
                if strong {
                    self.conflict = "Alex noticed the new security cameras that had been installed around the playground, their mechanical eyes following each child's movement.";
                    self.development = "Curious about what happened to the recordings, Alex decided to follow the wires leading from one of the cameras, careful to stay out of sight of the monitoring system.";
                    self.resolution = "Behind the school, Alex discovered an unused maintenance room where all the security feeds were displayed but no one was watching them, the illusion of surveillance was just that, an illusion.";
                }
            }
            Theme::Poetic => {
                self.intro = "Seven-year-old Alex, with wonder-filled eyes the color of autumn leaves, saw the world as a canvas of possibilities waiting to be explored.";
                self.setting = "As the final school bell echoed through the corridors and faded into silence, golden afternoon light spilled across the playground, transforming ordinary objects into treasures aglow.";
                if strong {
                    self.conclusion = "Walking home with pockets full of small discoveries, a perfect robin's feather, a uniquely shaped stone and a head full of stories, Alex felt the day fold itself into memory, another page in the book of childhood adventures.";
                }
            }
        }
    }

    fn render(&self) -> String {
        [
            self.intro,
            self.setting,
            self.conflict,
            self.development,
            self.resolution,
            self.conclusion,
        ]
        .join(" ")
    }
}

fn wants_story(query: &str) -> bool {
    let query = query.to_lowercase();
    query.contains("story") || query.contains("adventure")
}

/// Documents are applied least influential first so the strongest document
/// has the last word on any part two themes both rewrite.
fn story_answer(documents: &[WeightedDocument<'_>]) -> String {
    let mut template = StoryTemplate::default();
    for weighted in documents.iter().rev() {
        let doc = weighted.doc;
        let strong = doc.influence_score > STRONG_INFLUENCE;
        for theme in Theme::detect(&doc.name, &doc.content) {
            template.apply(theme, strong);
        }
    }
    template.render()
}

/// Non-blank sentence bodies, split on terminal punctuation and trimmed.
fn sentence_bodies(content: &str) -> Vec<&str> {
    content
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn general_answer(query: &str, documents: &[WeightedDocument<'_>]) -> String {
    let mut answer = format!(
        "Based on the documents you've provided, I can offer the following insights on \"{}\":\n\n",
        query.trim()
    );

    for weighted in documents {
        let doc = weighted.doc;
        let sentences = sentence_bodies(&doc.content);
        if sentences.is_empty() {
            continue;
        }
        let count = ((sentences.len() as f64 * doc.influence_score).floor() as usize).max(1);
        answer.push_str(&format!(
            "From {}: {}.\n\n",
            doc.name,
            sentences[..count.min(sentences.len())].join(". ")
        ));
    }

    answer.push_str(
        "This analysis is based on the documents you've provided, weighted according to the influence levels you've set.",
    );
    answer
}

/// Build a template answer from `documents` in weight order.
pub fn fallback_answer(query: &str, documents: &[WeightedDocument<'_>]) -> String {
    if documents.is_empty() {
        return NO_DOCUMENTS_MESSAGE.to_string();
    }

    let mut answer = if wants_story(query) {
        story_answer(documents)
    } else {
        general_answer(query, documents)
    };

    if documents.iter().any(|w| w.doc.is_poisoned()) {
        answer.push_str("\n\n");
        answer.push_str(POISONING_NOTE);
    }
    answer
}
