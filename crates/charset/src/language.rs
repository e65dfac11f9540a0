use crate::codepage::CodePage;
use crate::unicode::Script;

/// Letter statistics for one language plus the code pages it is usually written in.
#[derive(Debug)]
pub(crate) struct LanguageModel {
    pub name: &'static str,
    pub script: Script,
    /// Lowercase letters ordered from most to least frequent
    pub frequent: &'static str,
    /// Common lowercase letter pairs, space separated
    pub bigrams: &'static str,
    /// Candidate order doubles as tie-break order
    pub code_pages: &'static [CodePage],
}

pub(crate) const MODELS: &[LanguageModel] = &[
    LanguageModel {
        name: "russian",
        script: Script::Cyrillic,
        frequent: "оеаинтсрвлкмдпуяыьгзбчйхжшюцщэфъё",
        bigrams: "ст но то на ен ов ни ра во ко ро ал ре пр по ли ер ор ан ос го ет ол ль \
                  ом ка ть та ло ва ле ел од ес ат ла ти ит не ны де ск ем ин ак ие ми ве \
                  да за ил ки ой ог ый ся от ри",
        code_pages: &[
            CodePage::Windows1251,
            CodePage::Koi8R,
            CodePage::Iso8859_5,
            CodePage::Ibm866,
            CodePage::MacCyrillic,
        ],
    },
    LanguageModel {
        name: "greek",
        script: Script::Greek,
        frequent: "αοετισνηυρπκμλςωδγίόάέχθφήύβώξζψϊΐϋΰ",
        bigrams: "το ου αι ει τη να κα ντ πο ρο τα απ ερ ια ον με στ αν ην ης ος ες ικ ισ \
                  νε λο ρα επ αρ ατ ασ ρε κο συ γι ετ δε ση νο μα λα θε τι",
        code_pages: &[CodePage::Iso8859_7, CodePage::Windows1253],
    },
    LanguageModel {
        name: "western",
        script: Script::Latin,
        frequent: "éàèçüöäêáíóñúßâôîûëïùãõòìåøæœÿ",
        bigrams: "",
        code_pages: &[CodePage::Iso8859_1, CodePage::Windows1252],
    },
];

impl LanguageModel {
    pub(crate) fn frequency_rank(&self, lower: char) -> Option<usize> {
        self.frequent.chars().position(|c| c == lower)
    }

    pub(crate) fn bigram_pairs(&self) -> Vec<(char, char)> {
        self.bigrams
            .split_whitespace()
            .filter_map(|pair| {
                let mut chars = pair.chars();
                Some((chars.next()?, chars.next()?))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unicode::script_of;

    #[test]
    fn model_letters_belong_to_model_script() {
        for model in MODELS {
            for c in model.frequent.chars() {
                assert_eq!(script_of(c), model.script, "{} in {}", c, model.name);
            }
        }
    }

    #[test]
    fn bigrams_are_pairs_of_known_letters() {
        for model in MODELS {
            let declared = model.bigrams.split_whitespace().count();
            let pairs = model.bigram_pairs();
            assert_eq!(pairs.len(), declared, "{}", model.name);
            for (a, b) in pairs {
                assert!(model.frequency_rank(a).is_some(), "{a} in {}", model.name);
                assert!(model.frequency_rank(b).is_some(), "{b} in {}", model.name);
            }
        }
    }

    #[test]
    fn every_code_page_listed_once() {
        let mut labels: Vec<_> = MODELS
            .iter()
            .flat_map(|m| m.code_pages.iter().map(|p| p.label()))
            .collect();
        let total = labels.len();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), total);
    }
}
