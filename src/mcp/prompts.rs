/// A workflow prompt offered to the assistant host.
pub struct WorkflowPrompt {
    pub name: &'static str,
    pub description: &'static str,
    pub text: &'static str,
}

pub const PROMPTS: &[WorkflowPrompt] = &[
    WorkflowPrompt {
        name: "create_reading_list",
        description: "Template for creating a reading list in Reflect",
        text: r###"To create a reading list in Reflect:

1. First authenticate if needed:
   - Use the 'authenticate' tool
   - Follow the browser flow
   - Use 'set_access_token' with the code

2. Create a new note for your reading list:
   - Use 'create_note' with subject "Reading List"
   - Include your books/articles in markdown format

3. Add links to articles:
   - Use 'create_link' for each article
   - Include title and highlights

Example:
```
create_note(
    subject="2024 Reading List",
    content="## Books to Read\n- Book 1\n- Book 2\n\n## Articles\n"
)
```"###,
    },
    WorkflowPrompt {
        name: "daily_journal_workflow",
        description: "Template for daily journaling workflow",
        text: r###"Daily journaling workflow in Reflect:

1. Append to today's daily note:
   ```
   append_daily_note(
       text="- Completed project X\n- Meeting with team\n- Ideas for tomorrow",
       list_name="Journal"
   )
   ```

2. Create a reflection note:
   ```
   create_note(
       subject="Weekly Reflection - Week 1",
       content="## Accomplishments\n\n## Challenges\n\n## Next Week"
   )
   ```

3. Save interesting links:
   ```
   create_link(
       url="https://example.com/article",
       title="Interesting Article",
       highlights=["Key insight 1", "Important quote"]
   )
   ```"###,
    },
];

pub fn find(name: &str) -> Option<&'static WorkflowPrompt> {
    PROMPTS.iter().find(|p| p.name == name)
}
