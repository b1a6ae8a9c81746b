//! Multi-pattern match index over a dictionary's headwords.
//!
//! The index is an Aho-Corasick automaton: a trie of every headword, a
//! failure link per state pointing at the longest proper suffix that is also
//! a trie path, and an output link per state pointing at the nearest state on
//! the failure chain where a headword ends. It is built once and never
//! mutated; a changed dictionary means building a new index.
//!
//! Transitions missing from the trie are resolved on the fly by following
//! failure links, which keeps construction linear in the total headword
//! length and makes a scan linear in the text length (amortized) plus the
//! number of matches reported.

use std::fmt;

/// Identifier of a state in the automaton. The root is always `0`.
type StateId = u32;

/// Identifier of a headword, in the order headwords were first inserted.
pub type PatternId = u32;

const ROOT: StateId = 0;

struct State {
    /// Trie edges, sorted by character.
    edges: Vec<(char, StateId)>,
    /// Longest proper suffix of this state's path that is also a trie path.
    fail: StateId,
    /// Headword spelled by the root-to-here path, if it is one.
    terminal: Option<PatternId>,
    /// Nearest state on the failure chain with a `terminal`.
    output: Option<StateId>,
}

impl State {
    fn new() -> Self {
        Self { edges: Vec::new(), fail: ROOT, terminal: None, output: None }
    }

    fn edge(&self, ch: char) -> Option<StateId> {
        self.edges
            .binary_search_by_key(&ch, |&(c, _)| c)
            .ok()
            .map(|pos| self.edges[pos].1)
    }
}

/// A headword found inside a scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match<'a> {
    /// The matched headword.
    pub headword: &'a str,
    /// Byte offset in the text just past the last byte of the match.
    pub end: usize,
}

impl Match<'_> {
    /// Byte offset in the text where the match starts.
    pub fn start(&self) -> usize {
        self.end - self.headword.len()
    }
}

/// Immutable Aho-Corasick automaton mapping headwords to values.
///
/// `V` is whatever the caller wants back from an exact lookup; the dictionary
/// stores the raw entry markup there.
pub struct MatchIndex<V = ()> {
    states: Vec<State>,
    headwords: Vec<Box<str>>,
    values: Vec<V>,
}

#[cfg(test)]
impl MatchIndex<()> {
    /// Build an index over a set of headwords.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_entries(words.into_iter().map(|w| (w, ())))
    }
}

impl<V> MatchIndex<V> {
    /// Build an index over `(headword, value)` pairs.
    ///
    /// A headword seen more than once keeps its first value. Empty headwords
    /// are ignored: they would match at every position of every text.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, V)>,
        S: AsRef<str>,
    {
        let mut index = Self { states: vec![State::new()], headwords: Vec::new(), values: Vec::new() };
        for (word, value) in entries {
            index.insert(word.as_ref(), value);
        }
        index.link();
        tracing::debug!(
            "Built match index: {} headwords, {} states",
            index.headwords.len(),
            index.states.len()
        );
        index
    }

    fn insert(&mut self, word: &str, value: V) {
        if word.is_empty() {
            return;
        }
        let mut state = ROOT;
        for ch in word.chars() {
            let current = &self.states[state as usize];
            state = match current.edges.binary_search_by_key(&ch, |&(c, _)| c) {
                Ok(pos) => current.edges[pos].1,
                Err(pos) => {
                    let next = self.states.len() as StateId;
                    self.states[state as usize].edges.insert(pos, (ch, next));
                    self.states.push(State::new());
                    next
                }
            };
        }
        let terminal = &mut self.states[state as usize].terminal;
        if terminal.is_none() {
            *terminal = Some(self.headwords.len() as PatternId);
            self.headwords.push(word.into());
            self.values.push(value);
        }
    }

    /// Compute failure and output links breadth-first, so every shallower
    /// state is complete before its descendants need it.
    fn link(&mut self) {
        let mut queue = std::collections::VecDeque::new();
        for &(_, child) in &self.states[ROOT as usize].edges {
            queue.push_back(child);
        }

        while let Some(state) = queue.pop_front() {
            for i in 0..self.states[state as usize].edges.len() {
                let (ch, child) = self.states[state as usize].edges[i];
                queue.push_back(child);

                let fail = self.transition(self.states[state as usize].fail, ch);
                let target = &self.states[fail as usize];
                let output = if target.terminal.is_some() { Some(fail) } else { target.output };

                let child = &mut self.states[child as usize];
                child.fail = fail;
                child.output = output;
            }
        }
    }

    /// Follow `ch` from `state`, falling back along failure links.
    fn transition(&self, mut state: StateId, ch: char) -> StateId {
        loop {
            if let Some(next) = self.states[state as usize].edge(ch) {
                return next;
            }
            if state == ROOT {
                return ROOT;
            }
            state = self.states[state as usize].fail;
        }
    }

    /// Number of distinct headwords.
    pub fn len(&self) -> usize {
        self.headwords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headwords.is_empty()
    }

    pub fn headword(&self, id: PatternId) -> &str {
        &self.headwords[id as usize]
    }

    pub fn value(&self, id: PatternId) -> &V {
        &self.values[id as usize]
    }

    /// Resolve `word` to its headword id by walking trie edges only.
    ///
    /// Runs in time proportional to the length of `word`.
    pub fn exact(&self, word: &str) -> Option<PatternId> {
        let mut state = ROOT;
        for ch in word.chars() {
            state = self.states[state as usize].edge(ch)?;
        }
        self.states[state as usize].terminal
    }

    /// Value stored for `word`, if `word` is a headword.
    pub fn exact_lookup(&self, word: &str) -> Option<&V> {
        self.exact(word).map(|id| &self.values[id as usize])
    }

    /// Every headword occurring in `text`, scanning it once left to right.
    ///
    /// Matches are ordered by end offset ascending. Matches sharing an end
    /// offset come longest first, because the output chain runs from the
    /// deepest state towards the root; distinct headwords ending at the same
    /// offset always differ in length, so no further tie-break is needed.
    pub fn find_all<'a>(&'a self, text: &str) -> Vec<Match<'a>> {
        let mut matches = Vec::new();
        let mut state = ROOT;
        for (offset, ch) in text.char_indices() {
            state = self.transition(state, ch);
            let end = offset + ch.len_utf8();

            let current = &self.states[state as usize];
            let mut cursor = if current.terminal.is_some() { Some(state) } else { current.output };
            while let Some(hit) = cursor {
                let hit = &self.states[hit as usize];
                if let Some(id) = hit.terminal {
                    matches.push(Match { headword: &self.headwords[id as usize], end });
                }
                cursor = hit.output;
            }
        }
        matches
    }
}

impl<V> fmt::Debug for MatchIndex<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchIndex")
            .field("headwords", &self.headwords.len())
            .field("states", &self.states.len())
            .finish()
    }
}
