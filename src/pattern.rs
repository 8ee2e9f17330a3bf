//! Handshake pattern registry: the declarative token tables driving the
//! handshake state machine, plus pattern modifiers.

use std::fmt;

use crate::error::Error;

/// An atomic step in a message pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// Ephemeral key
    E,
    /// Static key
    S,
    /// Ephemeral-ephemeral DH
    EE,
    /// Ephemeral-static DH (initiator's ephemeral with responder's static)
    ES,
    /// Static-ephemeral DH (initiator's static with responder's ephemeral)
    SE,
    /// Static-static DH
    SS,
    /// Pre-shared key
    Psk,
}

/// The standard one-way and interactive handshake patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// One-way, responder static known.
    /// <- s
    /// -> e, es
    N,
    /// One-way, both statics known.
    /// -> s
    /// <- s
    /// -> e, es, ss
    K,
    /// One-way, responder static known, initiator transmits static.
    /// <- s
    /// -> e, es, s, ss
    X,
    /// No authentication.
    /// -> e
    /// <- e, ee
    NN,
    /// Initiator knows responder's static.
    /// <- s
    /// -> e, es
    /// <- e, ee
    NK,
    /// Responder transmits static.
    /// -> e
    /// <- e, ee, s, es
    NX,
    /// Initiator transmits static, responder anonymous.
    /// -> e
    /// <- e, ee
    /// -> s, se
    XN,
    /// Initiator knows responder's static and transmits its own.
    /// <- s
    /// -> e, es
    /// <- e, ee
    /// -> s, se
    XK,
    /// Mutual authentication, no prior knowledge.
    /// -> e
    /// <- e, ee, s, es
    /// -> s, se
    XX,
    /// Responder knows initiator's static.
    /// -> s
    /// -> e
    /// <- e, ee, se
    KN,
    /// Mutual static key authentication.
    /// -> s
    /// <- s
    /// -> e, es, ss
    /// <- e, ee, se
    KK,
    /// Responder knows initiator's static and transmits its own.
    /// -> s
    /// -> e
    /// <- e, ee, se, s, es
    KX,
    /// Initiator immediately transmits static.
    /// -> e, s
    /// <- e, ee, se
    IN,
    /// Initiator knows responder's static, one round trip.
    /// <- s
    /// -> e, es, s, ss
    /// <- e, ee, se
    IK,
    /// Initiator immediately transmits static, responder answers with its own.
    /// -> e, s
    /// <- e, ee, se, s, es
    IX,
}

/// XXfallback message patterns, role-relative to the new initiator.
/// The retained ephemeral stands in as the responder pre-message.
pub(crate) const XX_FALLBACK_MESSAGES: &[&[Token]] = &[
    &[Token::E, Token::EE, Token::S, Token::SE],
    &[Token::S, Token::ES],
];

impl Pattern {
    pub fn name(&self) -> &'static str {
        match self {
            Pattern::N => "N",
            Pattern::K => "K",
            Pattern::X => "X",
            Pattern::NN => "NN",
            Pattern::NK => "NK",
            Pattern::NX => "NX",
            Pattern::XN => "XN",
            Pattern::XK => "XK",
            Pattern::XX => "XX",
            Pattern::KN => "KN",
            Pattern::KK => "KK",
            Pattern::KX => "KX",
            Pattern::IN => "IN",
            Pattern::IK => "IK",
            Pattern::IX => "IX",
        }
    }

    /// Resolves a canonical pattern name, with optional modifier suffix:
    /// `"IK"`, `"XXfallback"`, `"NNpsk0+psk2"`.
    pub fn from_name(full: &str) -> Option<(Pattern, Modifiers)> {
        let split = full
            .find(|c: char| c.is_ascii_lowercase() || c.is_ascii_digit())
            .unwrap_or(full.len());
        let (base, suffix) = full.split_at(split);

        let pattern = match base {
            "N" => Pattern::N,
            "K" => Pattern::K,
            "X" => Pattern::X,
            "NN" => Pattern::NN,
            "NK" => Pattern::NK,
            "NX" => Pattern::NX,
            "XN" => Pattern::XN,
            "XK" => Pattern::XK,
            "XX" => Pattern::XX,
            "KN" => Pattern::KN,
            "KK" => Pattern::KK,
            "KX" => Pattern::KX,
            "IN" => Pattern::IN,
            "IK" => Pattern::IK,
            "IX" => Pattern::IX,
            _ => return None,
        };

        let mut modifiers = Modifiers::NONE;
        if !suffix.is_empty() {
            for part in suffix.split('+') {
                modifiers = modifiers
                    | match part {
                        "fallback" => Modifiers::FALLBACK,
                        "psk0" => Modifiers::psk(0),
                        "psk1" => Modifiers::psk(1),
                        "psk2" => Modifiers::psk(2),
                        "psk3" => Modifiers::psk(3),
                        _ => return None,
                    };
            }
        }
        Some((pattern, modifiers))
    }

    /// Static public keys the initiator is assumed to have shared before
    /// the handshake begins.
    pub(crate) fn initiator_pre_message(&self) -> &'static [Token] {
        match self {
            Pattern::K | Pattern::KN | Pattern::KK | Pattern::KX => &[Token::S],
            _ => &[],
        }
    }

    /// Static public keys the responder is assumed to have shared before
    /// the handshake begins.
    pub(crate) fn responder_pre_message(&self) -> &'static [Token] {
        match self {
            Pattern::N
            | Pattern::K
            | Pattern::X
            | Pattern::NK
            | Pattern::XK
            | Pattern::KK
            | Pattern::IK => &[Token::S],
            _ => &[],
        }
    }

    pub(crate) fn message_patterns(&self) -> &'static [&'static [Token]] {
        use Token::*;
        match self {
            Pattern::N => &[&[E, ES]],
            Pattern::K => &[&[E, ES, SS]],
            Pattern::X => &[&[E, ES, S, SS]],
            Pattern::NN => &[&[E], &[E, EE]],
            Pattern::NK => &[&[E, ES], &[E, EE]],
            Pattern::NX => &[&[E], &[E, EE, S, ES]],
            Pattern::XN => &[&[E], &[E, EE], &[S, SE]],
            Pattern::XK => &[&[E, ES], &[E, EE], &[S, SE]],
            Pattern::XX => &[&[E], &[E, EE, S, ES], &[S, SE]],
            Pattern::KN => &[&[E], &[E, EE, SE]],
            Pattern::KK => &[&[E, ES, SS], &[E, EE, SE]],
            Pattern::KX => &[&[E], &[E, EE, SE, S, ES]],
            Pattern::IN => &[&[E, S], &[E, EE, SE]],
            Pattern::IK => &[&[E, ES, S, SS], &[E, EE, SE]],
            Pattern::IX => &[&[E, S], &[E, EE, SE, S, ES]],
        }
    }

    /// One-way patterns carry a single message.
    pub fn is_one_way(&self) -> bool {
        self.message_patterns().len() == 1
    }

    /// Whether this side must supply a local static keypair: true when
    /// its pre-message or any of its tokens put the static to use.
    pub(crate) fn requires_local_static(&self, initiator: bool) -> bool {
        let pre = if initiator {
            self.initiator_pre_message()
        } else {
            self.responder_pre_message()
        };
        if pre.contains(&Token::S) {
            return true;
        }
        for (index, message) in self.message_patterns().iter().enumerate() {
            let ours = (index % 2 == 0) == initiator;
            for token in *message {
                match token {
                    Token::S if ours => return true,
                    Token::SS => return true,
                    Token::SE if initiator => return true,
                    Token::ES if !initiator => return true,
                    _ => {}
                }
            }
        }
        false
    }

    /// Whether this side must know the peer's static up front: true when
    /// the peer's static is a pre-message.
    pub(crate) fn requires_remote_static(&self, initiator: bool) -> bool {
        let peer_pre = if initiator {
            self.responder_pre_message()
        } else {
            self.initiator_pre_message()
        };
        peer_pre.contains(&Token::S)
    }

    /// Expands the message patterns with PSK tokens inserted per the
    /// modifiers: psk0 prepends to the first message, psk(i>0) appends
    /// to message i-1.
    pub(crate) fn build_message_patterns(
        &self,
        modifiers: Modifiers,
    ) -> Result<Vec<Vec<Token>>, Error> {
        let mut messages: Vec<Vec<Token>> = self
            .message_patterns()
            .iter()
            .map(|m| m.to_vec())
            .collect();
        for index in 0..=3 {
            if !modifiers.has_psk(index) {
                continue;
            }
            if index == 0 {
                messages[0].insert(0, Token::Psk);
            } else {
                let message = messages
                    .get_mut(index - 1)
                    .ok_or(Error::ForbiddenModifier)?;
                message.push(Token::Psk);
            }
        }
        Ok(messages)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pattern modifiers: fallback plus the four PSK placements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers(u8);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const FALLBACK: Modifiers = Modifiers(1);

    /// The pskN modifier. `index` must be 0-3.
    pub fn psk(index: usize) -> Modifiers {
        assert!(index <= 3, "psk modifier index must be 0-3");
        Modifiers(1 << (index + 1))
    }

    pub fn has_fallback(&self) -> bool {
        self.0 & Modifiers::FALLBACK.0 != 0
    }

    pub fn has_psk(&self, index: usize) -> bool {
        index <= 3 && self.0 & (1 << (index + 1)) != 0
    }

    pub fn psk_count(&self) -> usize {
        (self.0 >> 1).count_ones() as usize
    }

    /// Renders the modifier suffix of the protocol name: `""`,
    /// `"fallback"`, `"psk2"`, `"fallback+psk1"`.
    pub fn name_suffix(&self) -> String {
        let mut parts = Vec::new();
        if self.has_fallback() {
            parts.push("fallback".to_string());
        }
        for index in 0..=3 {
            if self.has_psk(index) {
                parts.push(format!("psk{}", index));
            }
        }
        parts.join("+")
    }
}

impl std::ops::BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Modifiers) -> Modifiers {
        Modifiers(self.0 | rhs.0)
    }
}
