//! Diesel schema for task lifecycle persistence.

diesel::table! {
    /// Task records, top-level and subtasks alike.
    tasks (id) {
        /// Task identifier.
        id -> Uuid,
        /// Title text.
        #[max_length = 255]
        title -> Varchar,
        /// Description text.
        description -> Text,
        /// Priority between 1 and 10.
        priority -> SmallInt,
        /// Deadline.
        deadline -> Timestamptz,
        /// First time the task left `unassigned`.
        start_date -> Nullable<Timestamptz>,
        /// Time the task entered `done`.
        completed_date -> Nullable<Timestamptz>,
        /// Recurrence interval in days.
        recurrence_days -> Nullable<Integer>,
        /// Lifecycle status.
        #[max_length = 32]
        status -> Varchar,
        /// Owning staff member.
        owner_id -> BigInt,
        /// Parent task for subtasks.
        parent_id -> Nullable<Uuid>,
        /// Linked project.
        project_id -> Nullable<BigInt>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
        /// Optimistic concurrency version.
        version -> BigInt,
    }
}

diesel::table! {
    /// Collaborator membership, owner included.
    task_collaborators (task_id, staff_id) {
        /// Task identifier.
        task_id -> Uuid,
        /// Collaborating staff member.
        staff_id -> BigInt,
    }
}

diesel::joinable!(task_collaborators -> tasks (task_id));
diesel::allow_tables_to_appear_in_same_query!(tasks, task_collaborators);
