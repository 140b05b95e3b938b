//! Prompt assembly for planning, generation, and refactoring calls.
//!
//! Pure string building. Every prompt ends with an instruction to return raw
//! content only; [`crate::extract::extract_content`] cleans up the responses
//! of models that ignore it anyway.

use crate::plan::{PlanFile, ProjectPlan};

/// Map a file path to a human-readable language name for prompt text.
///
/// Unknown extensions fall back to "programming" so prompts still read
/// naturally ("You are an expert programming developer" is clunky but
/// harmless, and matches what local models cope with best).
pub fn language_for_path(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().unwrap_or("");
    match ext {
        "py" => "Python",
        "js" => "JavaScript",
        "jsx" => "React JavaScript",
        "ts" => "TypeScript",
        "tsx" => "React TypeScript",
        "go" => "Go",
        "rs" => "Rust",
        "java" => "Java",
        "c" => "C",
        "cpp" | "cc" => "C++",
        "cs" => "C#",
        "php" => "PHP",
        "rb" => "Ruby",
        "swift" => "Swift",
        "kt" => "Kotlin",
        "dart" => "Dart",
        "vue" => "Vue",
        "html" => "HTML",
        "css" => "CSS",
        "scss" => "SCSS",
        "sql" => "SQL",
        "sh" => "Shell",
        "yml" | "yaml" => "YAML",
        "toml" => "TOML",
        "json" => "JSON",
        "md" => "Markdown",
        _ => "programming",
    }
}

/// Prompt for the planning call: ask for a JSON project plan.
pub fn build_plan_prompt(task: &str) -> String {
    format!(
        r#"You are an expert software architect. Based on the user's request, create a detailed project plan.

User Request: {task}

Create a JSON project plan with this structure:
{{
  "project_name": "short project name",
  "description": "brief description",
  "files": [
    {{
      "path": "relative/path/to/file.ext",
      "description": "what this file does"
    }}
  ],
  "setup_commands": ["npm install"]
}}

Rules:
- Include all necessary files for a complete, working project
- Keep file paths relative and use forward slashes
- Include configuration files, documentation, and tests as needed
- Return ONLY valid JSON, no markdown or explanations

Project plan:"#
    )
}

/// Prompt for one per-file generation job inside a plan.
pub fn build_file_prompt(file: &PlanFile, plan: &ProjectPlan) -> String {
    let language = language_for_path(&file.path);
    format!(
        r#"You are an expert {language} developer. Generate production-ready code for this file.

Project: {project}
Description: {project_description}

File: {path}
Purpose: {purpose}

Requirements:
- Write complete, functional code
- Include appropriate imports and dependencies
- Follow best practices for {language}
- Consider the context of other files in the project
- Return ONLY the file content, no markdown blocks or explanations

File content:"#,
        project = plan.project_name,
        project_description = plan.description,
        path = file.path,
        purpose = file.description,
    )
}

/// Prompt for generating one standalone file from a task description.
///
/// `context` entries are pre-formatted reference blocks (e.g. the content of
/// a `--context-file`) and are appended verbatim.
pub fn build_new_prompt(path: &str, task: &str, context: &[String]) -> String {
    let language = language_for_path(path);
    let mut prompt = format!(
        r#"You are an expert {language} developer. Generate high-quality, production-ready code.

Task: {task}
Filename: {path}
Language: {language}

Requirements:
- Write clean, well-structured code
- Handle errors appropriately
- Follow best practices and conventions for {language}
- Make the code complete and functional
- Return ONLY the code content that should be saved to the file
"#
    );

    if !context.is_empty() {
        prompt.push_str("\nContext:\n");
        prompt.push_str(&context.join("\n\n"));
        prompt.push('\n');
    }

    prompt
}

/// Prompt for refactoring an existing file according to a task.
pub fn build_refactor_prompt(
    task: &str,
    path: &str,
    code: &str,
    project_context: Option<&str>,
) -> String {
    let language = language_for_path(path);
    let mut prompt = format!(
        r#"You are an expert {language} developer. Refactor the following code based on the given task.

Task: {task}

Current code:
{code}

Requirements:
1. Maintain the same functionality unless the task explicitly requires changes
2. Follow {language} best practices and conventions
3. Improve code quality, readability, and maintainability
4. Preserve existing comments unless they need updating
"#
    );

    if let Some(context) = project_context {
        prompt.push_str(&format!("\nProject context:\n{context}\n"));
    }

    prompt.push_str(
        "\nGenerate only the refactored code, without any explanations or markdown formatting.\n\
         The output should be the complete file content after refactoring.",
    );

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_plan() -> ProjectPlan {
        ProjectPlan {
            project_name: "blog-api".to_string(),
            description: "REST API for a blog".to_string(),
            files: vec![PlanFile {
                path: "src/routes.py".to_string(),
                description: "HTTP route handlers".to_string(),
            }],
            setup_commands: vec![],
        }
    }

    #[test]
    fn test_language_for_path() {
        assert_eq!(language_for_path("src/main.py"), "Python");
        assert_eq!(language_for_path("a/b/c.tsx"), "React TypeScript");
        assert_eq!(language_for_path("Makefile"), "programming");
        assert_eq!(language_for_path("config.yaml"), "YAML");
    }

    #[test]
    fn test_plan_prompt_mentions_task_and_schema() {
        let prompt = build_plan_prompt("build a chat app");

        assert!(prompt.contains("build a chat app"));
        assert!(prompt.contains("\"project_name\""));
        assert!(prompt.contains("\"setup_commands\""));
        assert!(prompt.contains("ONLY valid JSON"));
    }

    #[test]
    fn test_file_prompt_includes_plan_context() {
        let plan = create_test_plan();

        let prompt = build_file_prompt(&plan.files[0], &plan);

        assert!(prompt.contains("Python developer"));
        assert!(prompt.contains("Project: blog-api"));
        assert!(prompt.contains("File: src/routes.py"));
        assert!(prompt.contains("Purpose: HTTP route handlers"));
    }

    #[test]
    fn test_new_prompt_with_context_blocks() {
        let context = vec!["Reference file (theme.ts):\n```\nexport {}\n```".to_string()];

        let prompt = build_new_prompt("Button.tsx", "create a button", &context);

        assert!(prompt.contains("React TypeScript developer"));
        assert!(prompt.contains("Task: create a button"));
        assert!(prompt.contains("Reference file (theme.ts)"));
    }

    #[test]
    fn test_new_prompt_without_context_has_no_context_header() {
        let prompt = build_new_prompt("main.go", "hello world", &[]);

        assert!(!prompt.contains("\nContext:\n"));
    }

    #[test]
    fn test_refactor_prompt_embeds_code_and_context() {
        let prompt = build_refactor_prompt(
            "extract helper functions",
            "lib/util.rb",
            "def x; end",
            Some("Project structure:\nlib/\n"),
        );

        assert!(prompt.contains("Ruby developer"));
        assert!(prompt.contains("def x; end"));
        assert!(prompt.contains("Project context:"));
        assert!(prompt.contains("complete file content after refactoring"));
    }
}
