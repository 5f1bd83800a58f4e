//! Built-in phoneme and voice tables of the synthesis engine.

use std::collections::BTreeMap;

/// Consonant phonemes (ARPAbet).
pub const CONSONANTS: &[&str] = &[
    "b",  // _b_in
    "ch", // _ch_in
    "d",  // _d_ebt
    "dh", // _th_is
    "dx", // ri_d_er
    "f",  // _f_in
    "g",  // _g_ive
    "hx", // _h_ead
    "jh", // _g_in
    "k",  // _c_at
    "l",  // _l_et
    "lx", // be_ll_
    "m",  // _m_et
    "n",  // _n_et
    "nx", // si_ng_
    "p",  // _p_in
    "r",  // _r_ed
    "rx", // o_r_ation
    "s",  // _s_it
    "sh", // _sh_in
    "t",  // _t_est
    "th", // _th_in
    "tx", // La_t_in
    "v",  // _v_est
    "w",  // _w_est
    "yx", // _y_et
    "z",  // _z_oo
    "zh", // mea_s_ure
];

/// Vowel phonemes (ARPAbet).
pub const VOWELS: &[&str] = &[
    "aa", // f_a_rther
    "ae", // b_a_t
    "ah", // b_u_t
    "ao", // b_ou_ght
    "aw", // ab_ou_t
    "ax", // _a_bout
    "ay", // b_i_te
    "eh", // b_e_t
    "el", // bott_le_
    "en", // butt_on_
    "er", // b_ear_
    "ey", // b_a_ke
    "ih", // b_i_t
    "ir", // b_eer_
    "iy", // b_ea_t
    "or", // b_ore_
    "ow", // b_oa_t
    "oy", // b_oy_
    "rr", // b_ir_d
    "uh", // b_oo_k
    "ur", // p_oor_
    "uw", // l_u_te
    "yu", // c_u_te
];

/// Pauses, silence and stress marks.
pub const SYMBOLS: &[&str] = &[",", ".", "_", "'", "`", "\""];

/// Symbols whose duration is always 0.
pub const NO_LENGTH: &[&str] = &[",", ".", "'", "`", "\""];

/// Voices built into the engine, selectable with `[:name X]`.
pub const DEFAULT_VOICES: &[&str] = &[
    "Betty", "Dennis", "Frank", "Harry", "Kit", "Paul", "Rita", "Ursula", "Wendy",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhonemeClass {
    Consonant,
    Vowel,
    Symbol,
}

pub fn classify(symbol: &str) -> Option<PhonemeClass> {
    if CONSONANTS.contains(&symbol) {
        Some(PhonemeClass::Consonant)
    } else if VOWELS.contains(&symbol) {
        Some(PhonemeClass::Vowel)
    } else if SYMBOLS.contains(&symbol) {
        Some(PhonemeClass::Symbol)
    } else {
        None
    }
}

pub fn is_phoneme(symbol: &str) -> bool {
    classify(symbol).is_some()
}

pub fn is_consonant(symbol: &str) -> bool {
    classify(symbol) == Some(PhonemeClass::Consonant)
}

pub fn has_no_length(symbol: &str) -> bool {
    NO_LENGTH.contains(&symbol)
}

/// Consonants and symbols never carry a pitch.
pub fn has_no_pitch(symbol: &str) -> bool {
    matches!(
        classify(symbol),
        Some(PhonemeClass::Consonant | PhonemeClass::Symbol)
    )
}

pub fn is_default_voice(name: &str) -> bool {
    DEFAULT_VOICES.contains(&name)
}

/// A tunable voice parameter with its accepted range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceParam {
    pub name: &'static str,
    pub min: i64,
    pub max: i64,
    /// Value used for a user voice that does not set this parameter.
    pub default: i64,
}

const fn param(name: &'static str, min: i64, max: i64, default: i64) -> VoiceParam {
    VoiceParam {
        name,
        min,
        max,
        default,
    }
}

/// Voice parameters in the order `[:name]` emits them.
pub const VOICE_PARAMS: &[VoiceParam] = &[
    // Vocal tract
    param("sx", 0, 1, 1),
    param("hs", 65, 145, 100),
    param("f4", 2000, 4650, 3300),
    param("f5", 2500, 4950, 3650),
    param("b4", 100, 2048, 260),
    param("b5", 100, 2048, 330),
    // Voicing source
    param("br", 0, 72, 0),
    param("lx", 0, 100, 0),
    param("sm", 0, 100, 3),
    param("ri", 0, 100, 100),
    param("nf", 0, 100, 0),
    param("la", 0, 100, 0),
    // Intonation
    param("bf", 0, 40, 18),
    param("hr", 2, 100, 100),
    param("sr", 1, 100, 32),
    param("as", 0, 100, 100),
    param("qu", 0, 100, 40),
    param("ap", 50, 350, 122),
    param("pr", 0, 250, 100),
    // Gains
    param("lo", 0, 86, 86),
    param("gv", 0, 86, 65),
    param("gh", 0, 86, 70),
    param("gf", 0, 86, 70),
    param("g1", 0, 86, 68),
    param("g2", 0, 86, 60),
    param("g3", 0, 86, 48),
    param("g4", 0, 86, 64),
];

pub fn voice_param(name: &str) -> Option<&'static VoiceParam> {
    VOICE_PARAMS.iter().find(|p| p.name == name)
}

/// Parameter map every user voice starts from.
pub fn default_voice_params() -> BTreeMap<String, i64> {
    VOICE_PARAMS
        .iter()
        .map(|p| (p.name.to_string(), p.default))
        .collect()
}
