// src/analyses/prompt.rs
//! Prompt construction for CV evaluation.

pub const CV_TEXT_PLACEHOLDER: &str = "CV text not available";

pub const SYSTEM_PROMPT: &str = "Vous êtes un expert en recrutement et analyse de CV. \
Votre rôle est d'analyser les CV et lettres de motivation pour aider les recruteurs à évaluer les candidats.

Vous devez :
1. Extraire les informations clés du CV de manière structurée
2. Évaluer les compétences et l'expérience du candidat
3. Analyser l'adéquation avec le poste si une description est fournie
4. Fournir des recommandations constructives
5. Donner une note globale (A, B, C, D, E)
6. Suggérer les prochaines étapes du processus de recrutement

Soyez objectif, professionnel et constructif dans vos analyses. \
Répondez toujours en JSON valide avec la structure demandée.";

const RESPONSE_SCHEMA: &str = r#"{
  "profile_summary": "Résumé professionnel du candidat en 2-3 phrases",
  "key_skills": ["compétence1", "compétence2", "compétence3"],
  "education": [{"degree": "diplôme", "institution": "établissement", "year": "année"}],
  "experience": [{"position": "poste", "company": "entreprise", "duration": "durée", "description": "description"}],
  "languages": [{"language": "langue", "level": "niveau"}],
  "strengths": ["force1", "force2", "force3"],
  "weaknesses": ["faiblesse1", "faiblesse2"],
  "job_match_score": 85,
  "job_match_analysis": "Analyse de l'adéquation avec le poste",
  "recommendations": ["recommandation1", "recommandation2"],
  "overall_rating": "A",
  "next_steps": ["étape1", "étape2"]
}"#;

/// Joins title, description and requirements of an opening into the job
/// section of the prompt.
pub fn job_description(title: &str, description: &str, requirements: &str) -> String {
    [title, description, requirements]
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_user_prompt(
    cv_text: Option<&str>,
    cover_letter_text: Option<&str>,
    job_description: Option<&str>,
) -> String {
    let cv = cv_text
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(CV_TEXT_PLACEHOLDER);

    let mut prompt = String::from("Analysez le CV suivant et fournissez une analyse structurée :\n\n");
    prompt.push_str("=== CV ===\n");
    prompt.push_str(cv);
    prompt.push_str("\n\n");

    if let Some(letter) = cover_letter_text.map(str::trim).filter(|s| !s.is_empty()) {
        prompt.push_str("=== LETTRE DE MOTIVATION ===\n");
        prompt.push_str(letter);
        prompt.push_str("\n\n");
    }

    if let Some(job) = job_description.map(str::trim).filter(|s| !s.is_empty()) {
        prompt.push_str("=== DESCRIPTION DU POSTE ===\n");
        prompt.push_str(job);
        prompt.push_str("\n\n");
    }

    prompt.push_str(
        "Veuillez analyser ce candidat et fournir une réponse JSON avec la structure suivante :\n",
    );
    prompt.push_str(RESPONSE_SCHEMA);
    prompt.push_str("\n\n");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_when_cv_text_missing() {
        let prompt = build_user_prompt(None, None, Some("Développeur Rust"));
        assert!(prompt.contains("=== CV ===\nCV text not available"));
        assert!(!prompt.contains("LETTRE DE MOTIVATION"));
        assert!(prompt.contains("=== DESCRIPTION DU POSTE ===\nDéveloppeur Rust"));
    }

    #[test]
    fn test_all_sections_and_schema() {
        let prompt = build_user_prompt(Some("10 ans de Rust"), Some("Motivé"), None);
        assert!(prompt.contains("10 ans de Rust"));
        assert!(prompt.contains("=== LETTRE DE MOTIVATION ===\nMotivé"));
        assert!(!prompt.contains("DESCRIPTION DU POSTE"));
        assert!(prompt.contains("\"job_match_score\": 85"));
        assert!(prompt.contains("\"next_steps\""));
    }

    #[test]
    fn test_job_description_skips_blank_parts() {
        assert_eq!(job_description("Titre", "  ", "Rust"), "Titre\n\nRust");
    }
}
